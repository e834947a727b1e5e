//! Google service-account authentication.

pub mod service_account;

pub use service_account::{
    AccessToken, ServiceAccountAuth, ServiceAccountKey, ANALYTICS_READONLY_SCOPE,
    DRIVE_READONLY_SCOPE, SPREADSHEETS_SCOPE,
};

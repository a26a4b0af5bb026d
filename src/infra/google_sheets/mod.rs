// =============================================================================
// GOOGLE SHEETS MODULE
// =============================================================================
//
// Everything needed to talk to a Google spreadsheet as a service account:
//
// - `service_account`: loads the JSON key and trades it for OAuth2 tokens
// - `sheets_client`: REST calls against the Sheets API v4
// - `a1`: builds A1-notation ranges
//
// The spreadsheet has to be shared with the service account's email address.

pub mod a1;
pub mod service_account;
pub mod sheets_client;

pub use service_account::{AccessTokenSource, AuthError, ServiceAccountAuth};
pub use sheets_client::{SheetProperties, SheetsClient, SheetsError};

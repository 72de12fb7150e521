pub mod leave_request;
pub mod profile;
pub mod report;

use crate::leave::LeaveEngine;
use crate::store::mysql::MySqlStore;

/// Engine wired to the production store, shared as `web::Data`.
pub type AppEngine = LeaveEngine<MySqlStore>;

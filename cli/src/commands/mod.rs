mod account;
mod analytics;
mod dashboard;
mod helpers;
mod profile;
mod transfer;
mod weight;

pub(crate) use account::{cmd_login, cmd_logout, cmd_reset, cmd_signup, cmd_whoami};
pub(crate) use analytics::cmd_analytics;
pub(crate) use dashboard::cmd_dashboard;
pub(crate) use profile::{cmd_profile_goals, cmd_profile_set, cmd_profile_show};
pub(crate) use transfer::{cmd_export, cmd_import_csv};
pub(crate) use weight::{cmd_weight_delete, cmd_weight_history, cmd_weight_log, cmd_weight_show};

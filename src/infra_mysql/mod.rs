mod identity_repo_mysql;
mod util;

pub use identity_repo_mysql::*;

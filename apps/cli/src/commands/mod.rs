pub mod check_config;
pub mod generate_sql;
pub mod run;

mod common;
mod config_watch;
mod discovery;

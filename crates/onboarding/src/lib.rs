//! Interactive account setup.

pub mod connect;
pub mod wizard;

pub use {
    connect::{ConnectHandler, ConnectedAccount},
    wizard::{SetupOptions, print_summary, run_setup},
};

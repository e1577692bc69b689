//! A command-line tool to check whether directories are safe to use.
//!
//! This crate is a thin front end to the [`dir_trust`] library: it loads a
//! [`TrustPolicy`](dir_trust::TrustPolicy) from configuration, checks every
//! path it is given, and prints one line per path.
//!
//! # Command-line interface
//!
//! `dir-trust` uses the [`clap`](https://docs.rs/clap/) crate for
//! command-line argument parsing; run `dir-trust help` to get it to print
//! its documentation.
//!
//! ```text
//! $ dir-trust check /var/lib/myservice /tmp/scratch
//! secure: /var/lib/myservice (/var/lib/myservice)
//! INSECURE: /tmp/scratch: Untrusted all other users may modify /tmp (access mask 0x...)
//! ```
//!
//! The exit status is 0 if every path was secure, and 1 otherwise.
//!
//! # Configuration
//!
//! By default, `dir-trust` looks for a configuration file in a
//! platform-dependent location.  That's `~/.config/dir-trust/config.toml` on
//! Unix.  More files can be given with `-c FILE`, and single options can be
//! overridden with `-o KEY=VALUE`.
//!
//! The configuration file is TOML:
//!
//! ```toml
//! [logging]
//! trace_filter = "debug"
//!
//! [policy]
//! stop_at = "/home/alice"
//! trust_group = 100
//! trust_admin_only = false
//! ```

#![warn(missing_docs)]
#![deny(missing_docs)]
#![warn(noop_method_call)]
#![deny(unreachable_pub)]
#![deny(clippy::all)]
#![deny(clippy::await_holding_lock)]
#![deny(clippy::cargo_common_metadata)]
#![deny(clippy::cast_lossless)]
#![deny(clippy::checked_conversions)]
#![warn(clippy::clone_on_ref_ptr)]
#![warn(clippy::cognitive_complexity)]
#![deny(clippy::debug_assert_with_mut_call)]
#![deny(clippy::exhaustive_enums)]
#![deny(clippy::exhaustive_structs)]
#![deny(clippy::expl_impl_clone_on_copy)]
#![deny(clippy::fallible_impl_from)]
#![deny(clippy::implicit_clone)]
#![deny(clippy::large_stack_arrays)]
#![warn(clippy::manual_ok_or)]
#![deny(clippy::missing_docs_in_private_items)]
#![deny(clippy::missing_panics_doc)]
#![warn(clippy::needless_borrow)]
#![warn(clippy::needless_pass_by_value)]
#![warn(clippy::option_option)]
#![allow(clippy::print_stderr)] // Allowed in this crate only.
#![allow(clippy::print_stdout)] // Allowed in this crate only.
#![warn(clippy::rc_buffer)]
#![deny(clippy::ref_option_ref)]
#![warn(clippy::semicolon_if_nothing_returned)]
#![warn(clippy::trait_duplication_in_bounds)]
#![deny(clippy::unnecessary_wraps)]
#![warn(clippy::unseparated_literal_suffix)]
#![deny(clippy::unwrap_used)]

mod app;

use clap::Parser;

fn main() -> anyhow::Result<()> {
    let app = app::App::parse();

    if !app.run()? {
        std::process::exit(1);
    }
    Ok(())
}

//! Types shared by the Vela node, the genesis tool and the test harness:
//! the binary codec, keys and addresses, transactions and the JSON-RPC
//! plumbing (behind the `rpc*` features).

#![allow(clippy::too_many_arguments, clippy::upper_case_acronyms)]

pub mod api;
pub mod config;
pub mod crypto;
pub mod serializer;
pub mod time;
pub mod transaction;
pub mod utils;

#[cfg(feature = "rpc")]
pub mod rpc;

/// Help output styling shared by the `vela_daemon` and `vela_genesis` binaries
#[cfg(feature = "clap")]
pub fn get_cli_styles() -> clap::builder::Styles {
    use clap::builder::styling::{AnsiColor, Effects, Styles};

    let bold = |color: AnsiColor| color.on_default().effects(Effects::BOLD);
    Styles::styled()
        .header(bold(AnsiColor::Cyan))
        .usage(bold(AnsiColor::Cyan))
        .literal(AnsiColor::BrightWhite.on_default())
        .placeholder(AnsiColor::BrightBlack.on_default())
        .valid(AnsiColor::Green.on_default())
        .invalid(bold(AnsiColor::Red))
        .error(bold(AnsiColor::Red))
}

use crate::output::{CmdFailure, JsonResult};

pub type CmdResult<T> = std::result::Result<(T, i32), CmdFailure>;

pub mod release;
pub mod version;

/// Dispatch a command to its handler and map result to JSON.
macro_rules! dispatch {
    ($args:expr, $module:ident) => {
        crate::output::map_cmd_result_to_json($module::run($args))
    };
}

pub(crate) fn run_json(command: crate::Commands) -> (JsonResult, i32) {
    crate::tty::status("relman is working...");

    match command {
        crate::Commands::Release(args) => dispatch!(args, release),
        crate::Commands::Version(args) => dispatch!(args, version),
    }
}

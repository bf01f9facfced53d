mod response;
mod trace;

pub use response::{map_cmd_result_to_json, print_json_result};
pub use trace::StderrTrace;

pub(crate) const USAGE_MSG: &str = "Usage: tsh [-hvp]";

const HELP_MSG: &str = "   -h, --help        print this message
   -v, --verbose     print additional diagnostic information
   -p, --no-prompt   do not emit a command prompt";

pub(crate) fn long_help_message() -> String {
    format!("{USAGE_MSG}\n{HELP_MSG}")
}

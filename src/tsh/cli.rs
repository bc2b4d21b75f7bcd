#[derive(Debug, PartialEq)]
pub(crate) struct TshOptions {
    pub(crate) verbose: bool,
    pub(crate) prompt: bool,
    pub(crate) action: TshAction,
}

impl Default for TshOptions {
    fn default() -> Self {
        Self {
            verbose: false,
            prompt: true,
            action: TshAction::Run,
        }
    }
}

#[derive(Debug, PartialEq)]
pub(crate) enum TshAction {
    Help,
    Run,
}

type OptionSetter = fn(&mut TshOptions);

struct TshOption {
    short: char,
    long: &'static str,
    set: OptionSetter,
}

impl TshOptions {
    const TSH_OPTIONS: &'static [TshOption] = &[
        TshOption {
            short: 'h',
            long: "help",
            set: |options| options.action = TshAction::Help,
        },
        TshOption {
            short: 'p',
            long: "no-prompt",
            set: |options| options.prompt = false,
        },
        TshOption {
            short: 'v',
            long: "verbose",
            set: |options| options.verbose = true,
        },
    ];

    pub(crate) fn from_env() -> Result<TshOptions, String> {
        let args = std::env::args().collect();

        Self::parse_arguments(args)
    }

    /// parse tsh arguments into a TshOptions struct
    pub(crate) fn parse_arguments(arguments: Vec<String>) -> Result<TshOptions, String> {
        let mut options = TshOptions::default();

        for arg in arguments.into_iter().skip(1) {
            if let Some(long) = arg.strip_prefix("--") {
                // none of the options take a value
                if let Some((key, _)) = long.split_once('=') {
                    if Self::TSH_OPTIONS.iter().any(|o| o.long == key) {
                        Err(format!("'--{key}' does not take any arguments"))?;
                    }
                }

                let option = Self::TSH_OPTIONS
                    .iter()
                    .find(|o| o.long == long)
                    .ok_or_else(|| format!("unrecognized option '{arg}'"))?;
                (option.set)(&mut options);
            } else if let Some(flags) = arg.strip_prefix('-').filter(|flags| !flags.is_empty()) {
                // flags can be grouped, so we loop over the characters
                for char in flags.chars() {
                    let option = Self::TSH_OPTIONS
                        .iter()
                        .find(|o| o.short == char)
                        .ok_or_else(|| format!("invalid option -- '{char}'"))?;
                    (option.set)(&mut options);
                }
            } else {
                Err(format!("unexpected argument '{arg}'"))?;
            }
        }

        Ok(options)
    }
}

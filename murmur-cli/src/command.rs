use murmur_client::{
    composer::{Affordance, engine::Format},
    dialog::{DialogMode, Point},
    feed::Interaction,
};
use std::str::FromStr;
use thiserror::Error;

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub enum Command {
    Help,
    Quit,
    Login {
        email: String,
        password: String,
    },
    Signup {
        name: String,
        email: String,
        password: String,
    },
    Logout,
    WhoAmI,
    Type(String),
    NewLine,
    Format(Format),
    Emoji(String),
    Emojis,
    Discard,
    Publish,
    Feed,
    Interact {
        interaction: Interaction,
        /// 1-based position in the feed.
        position: usize,
    },
    Affordance(Affordance),
    Open(DialogMode),
    Switch,
    Escape,
    Tab {
        backwards: bool,
    },
    Click(Point),
    Focus(String),
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Error)]
pub enum CommandError {
    #[error("Unknown command: {0} (try `help`)")]
    Unknown(String),
    #[error("Usage: {0}")]
    Usage(&'static str),
    #[error("Not a number: {0}")]
    InvalidNumber(String),
}

fn number<T: FromStr>(arg: &str) -> Result<T, CommandError> {
    arg.parse()
        .map_err(|_| CommandError::InvalidNumber(arg.to_owned()))
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (name, rest) = line.split_once(' ').unwrap_or((line, ""));
        let rest = rest.trim();
        let args: Vec<&str> = rest.split_whitespace().collect();

        let command = match (name, args.as_slice()) {
            ("help" | "?", _) => Command::Help,
            ("quit" | "exit", _) => Command::Quit,
            ("login", [email, password]) => Command::Login {
                email: (*email).to_owned(),
                password: (*password).to_owned(),
            },
            ("login", _) => return Err(CommandError::Usage("login <email> <password>")),
            ("signup", [name @ .., email, password]) if !name.is_empty() => Command::Signup {
                name: name.join(" "),
                email: (*email).to_owned(),
                password: (*password).to_owned(),
            },
            ("signup", _) => return Err(CommandError::Usage("signup <name> <email> <password>")),
            ("logout", _) => Command::Logout,
            ("whoami", _) => Command::WhoAmI,
            ("type", _) if !rest.is_empty() => Command::Type(rest.to_owned()),
            ("type", _) => return Err(CommandError::Usage("type <text>")),
            ("enter", _) => Command::NewLine,
            ("bold", _) => Command::Format(Format::Bold),
            ("italic", _) => Command::Format(Format::Italic),
            ("underline", _) => Command::Format(Format::Underline),
            ("strike", _) => Command::Format(Format::Strike),
            ("emoji", [emoji]) => Command::Emoji((*emoji).to_owned()),
            ("emoji", _) => return Err(CommandError::Usage("emoji <emoji>")),
            ("emojis", _) => Command::Emojis,
            ("discard", _) => Command::Discard,
            ("publish", _) => Command::Publish,
            ("feed", _) => Command::Feed,
            ("like" | "comment" | "share", [position]) => Command::Interact {
                interaction: match name {
                    "like" => Interaction::Like,
                    "comment" => Interaction::Comment,
                    _ => Interaction::Share,
                },
                position: number(position)?,
            },
            ("like" | "comment" | "share", _) => {
                return Err(CommandError::Usage("like|comment|share <position>"));
            }
            ("attach", _) => Command::Affordance(Affordance::Attachment),
            ("voice", _) => Command::Affordance(Affordance::VoiceMessage),
            ("photo", _) => Command::Affordance(Affordance::Photo),
            ("open", [] | ["login"]) => Command::Open(DialogMode::Login),
            ("open", ["signup"]) => Command::Open(DialogMode::Signup),
            ("open", _) => return Err(CommandError::Usage("open [login|signup]")),
            ("switch", _) => Command::Switch,
            ("esc", _) => Command::Escape,
            ("tab", []) => Command::Tab { backwards: false },
            ("tab", ["back"]) => Command::Tab { backwards: true },
            ("tab", _) => return Err(CommandError::Usage("tab [back]")),
            ("click", [x, y]) => Command::Click(Point {
                x: number(x)?,
                y: number(y)?,
            }),
            ("click", _) => return Err(CommandError::Usage("click <x> <y>")),
            ("focus", [id]) => Command::Focus((*id).to_owned()),
            ("focus", _) => return Err(CommandError::Usage("focus <element>")),
            (name, _) => return Err(CommandError::Unknown(name.to_owned())),
        };

        Ok(command)
    }
}

pub const HELP: &str = "\
Session:   login <email> <password> | signup <name> <email> <password> | logout | whoami
Composer:  type <text> | enter | bold | italic | underline | strike | emoji <e> | emojis
           discard | publish | attach | voice | photo
Feed:      feed | like <n> | comment <n> | share <n>
Dialog:    open [login|signup] | switch | esc | tab [back] | click <x> <y> | focus <element>
Other:     help | quit";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Role {
    System,
    #[default]
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    /// Returns the role selected by a role-switch argument, if `token` is one.
    pub fn from_switch(token: &str) -> Option<Self> {
        match token {
            "--system" => Some(Self::System),
            "--user" => Some(Self::User),
            "--assistant" => Some(Self::Assistant),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Turns positional arguments into conversation turns.
///
/// `--system`, `--user` and `--assistant` switch the role applied to every
/// following argument and are not emitted themselves. Everything else becomes
/// a message under the current role, which starts out as [`Role::User`].
/// A literal message equal to one of the switch tokens cannot be expressed.
pub fn classify<S: AsRef<str>>(args: &[S]) -> Vec<ChatMessage> {
    let (_, messages) = args.iter().map(|arg| arg.as_ref()).fold(
        (Role::default(), Vec::with_capacity(args.len())),
        |(role, mut messages), token: &str| match Role::from_switch(token) {
            Some(next) => (next, messages),
            None => {
                messages.push(ChatMessage::new(role, token));
                (role, messages)
            }
        },
    );
    messages
}

//! In-band slash commands.
//!
//! A chat line whose text starts with `/` is interpreted instead of
//! broadcast. The command set is closed; unrecognized commands are ignored
//! rather than rejected, so clients can probe without tripping protocol
//! errors.

/// Fixed reply line for `/joke`.
pub(crate) const JOKE_LINE: &str = "The best time on a clock is 6:30--hands down.";

/// A parsed slash command. Matched on the first space-delimited token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command<'a> {
    /// `/joke` - scripted joke, sent to the requester only.
    Joke,
    /// `/members` - roster of the current room, sent to the requester only.
    Members,
    /// `/priv <name> <message...>` - private message to one room member.
    Priv {
        /// Target display name (second token).
        to: &'a str,
        /// Message text: everything after the first two tokens, verbatim.
        text: &'a str,
    },
    /// Any other `/`-prefixed text, including a `/priv` with no target.
    /// Silently ignored.
    Unknown,
}

impl<'a> Command<'a> {
    /// Parse a slash-prefixed chat line.
    #[must_use]
    pub fn parse(text: &'a str) -> Self {
        let mut parts = text.splitn(3, ' ');
        match parts.next() {
            Some("/joke") => Command::Joke,
            Some("/members") => Command::Members,
            Some("/priv") => match parts.next() {
                Some(to) if !to.is_empty() => Command::Priv {
                    to,
                    text: parts.next().unwrap_or(""),
                },
                _ => Command::Unknown,
            },
            _ => Command::Unknown,
        }
    }
}

use owo_colors::{OwoColorize, Style as OwoStyle};

/// Semantic colour roles used by the rendered views.
#[derive(Debug, Clone, Copy)]
enum Role {
    Heading,
    Success,
    Warning,
    Error,
    Muted,
    Value,
}

impl Role {
    fn style(self) -> OwoStyle {
        let style = OwoStyle::new();
        match self {
            Self::Heading => style.bold().cyan(),
            Self::Success => style.bold().green(),
            Self::Warning => style.bold().yellow(),
            Self::Error => style.bold().red(),
            Self::Muted => style.dimmed(),
            Self::Value => style.bold(),
        }
    }
}

/// Applies colour and style to terminal text.
///
/// Whether colour is wanted is decided once at construction; call sites then
/// ask for a semantic role, keeping the palette in one place.
#[derive(Debug)]
pub(crate) struct Painter {
    use_colour: bool,
}

impl Painter {
    /// Creates a painter with explicit colour control.
    pub(crate) fn new(use_colour: bool) -> Self {
        Self { use_colour }
    }

    pub(crate) fn heading<T: AsRef<str>>(&self, text: T) -> String {
        self.paint(text.as_ref(), Role::Heading)
    }

    pub(crate) fn success<T: AsRef<str>>(&self, text: T) -> String {
        self.paint(text.as_ref(), Role::Success)
    }

    pub(crate) fn warning<T: AsRef<str>>(&self, text: T) -> String {
        self.paint(text.as_ref(), Role::Warning)
    }

    pub(crate) fn error<T: AsRef<str>>(&self, text: T) -> String {
        self.paint(text.as_ref(), Role::Error)
    }

    pub(crate) fn muted<T: AsRef<str>>(&self, text: T) -> String {
        self.paint(text.as_ref(), Role::Muted)
    }

    pub(crate) fn value<T: AsRef<str>>(&self, text: T) -> String {
        self.paint(text.as_ref(), Role::Value)
    }

    fn paint(&self, text: &str, role: Role) -> String {
        if self.use_colour {
            format!("{}", text.style(role.style()))
        } else {
            text.to_string()
        }
    }
}

use console::{Emoji, style};

pub static ERROR_ICON: Emoji<'_, '_> = Emoji("❌ ", "");
pub static STATUS_ICON: Emoji<'_, '_> = Emoji("🌡️  ", "");
pub static PARAMS_ICON: Emoji<'_, '_> = Emoji("⚓ ", "");
pub static RESULTS_ICON: Emoji<'_, '_> = Emoji("📝 ", "");
pub static WORKSPACES_ICON: Emoji<'_, '_> = Emoji("📂 ", "");
pub static STEPS_ICON: Emoji<'_, '_> = Emoji("🦶 ", "");
pub static SIDECARS_ICON: Emoji<'_, '_> = Emoji("🚗 ", "");
pub static BULLET: Emoji<'_, '_> = Emoji("∙ ", "- ");

pub fn print_error(msg: &str) {
    eprintln!("{} {}", ERROR_ICON, style(msg).red().bold());
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Icon {
    Status,
    Params,
    Results,
    Workspaces,
    Steps,
    Sidecars,
}

impl Icon {
    fn emoji(self) -> &'static Emoji<'static, 'static> {
        match self {
            Icon::Status => &STATUS_ICON,
            Icon::Params => &PARAMS_ICON,
            Icon::Results => &RESULTS_ICON,
            Icon::Workspaces => &WORKSPACES_ICON,
            Icon::Steps => &STEPS_ICON,
            Icon::Sidecars => &SIDECARS_ICON,
        }
    }
}

/// Terminal decoration for reports. When disabled every helper returns its
/// input unchanged, so reports are plain text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Decor {
    enabled: bool,
}

impl Decor {
    #[cfg(test)]
    pub fn plain() -> Self {
        Self { enabled: false }
    }

    #[cfg(test)]
    pub fn colored() -> Self {
        Self { enabled: true }
    }

    /// Decorates only when stdout supports it and the user did not opt out.
    pub fn detect(no_color: bool) -> Self {
        Self {
            enabled: !no_color && console::colors_enabled(),
        }
    }

    #[cfg(test)]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn bold(&self, text: &str) -> String {
        if !self.enabled {
            return text.to_string();
        }
        style(text).bold().force_styling(true).to_string()
    }

    /// Section title.
    pub fn title(&self, text: &str) -> String {
        if !self.enabled {
            return text.to_string();
        }
        style(text).underlined().bold().force_styling(true).to_string()
    }

    pub fn icon(&self, icon: Icon) -> String {
        if !self.enabled {
            return String::new();
        }
        icon.emoji().to_string()
    }

    pub fn bullet(&self, text: &str) -> String {
        if !self.enabled {
            return text.to_string();
        }
        format!("{}{}", BULLET, text)
    }

    /// Colors a run or component status label by outcome.
    pub fn status(&self, label: &str) -> String {
        if !self.enabled {
            return label.to_string();
        }
        let styled = style(label).force_styling(true);
        match label {
            "Succeeded" | "Completed" => styled.green().to_string(),
            "Failed" | "Timed Out" | "Error" => styled.red().to_string(),
            "Running" => styled.blue().to_string(),
            "Cancelled" | "PodInitializing" => styled.yellow().to_string(),
            _ => label.to_string(),
        }
    }
}

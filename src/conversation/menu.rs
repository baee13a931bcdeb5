//! Inline choice menus shown under prompts

use crate::models::{Category, Choice, ControlAction, PLATFORMS, SERVICES, TONES};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    /// Payload echoed back by the transport when pressed
    pub data: String,
}

impl Button {
    fn choice(category: Category, choice: &Choice, label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            data: format!("{}:{}", category.prefix(), choice.key),
        }
    }

    fn control(action: ControlAction, label: &str) -> Self {
        Self {
            label: label.to_string(),
            data: format!("control:{}", action.key()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Menu {
    pub rows: Vec<Vec<Button>>,
}

impl Menu {
    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(Vec::is_empty)
    }

    #[cfg(test)]
    pub fn buttons(&self) -> impl Iterator<Item = &Button> {
        self.rows.iter().flatten()
    }
}

fn grid(category: Category, choices: &[Choice]) -> Menu {
    Menu {
        rows: choices
            .chunks(2)
            .map(|pair| {
                pair.iter()
                    .map(|c| Button::choice(category, c, c.label))
                    .collect()
            })
            .collect(),
    }
}

pub fn platform_menu() -> Menu {
    grid(Category::Platform, PLATFORMS)
}

pub fn tone_menu() -> Menu {
    grid(Category::Tone, TONES)
}

/// One service per row, ticked when selected, followed by the Done row.
pub fn services_menu(selected: &[String]) -> Menu {
    let mut rows: Vec<Vec<Button>> = SERVICES
        .iter()
        .map(|c| {
            let label = if selected.iter().any(|s| s == c.key) {
                format!("✅ {}", c.label)
            } else {
                c.label.to_string()
            };
            vec![Button::choice(Category::Service, c, label)]
        })
        .collect();
    rows.push(vec![Button::control(
        ControlAction::DoneServices,
        "➡️ Done Selecting ➡️",
    )]);
    Menu { rows }
}

pub fn context_menu() -> Menu {
    Menu {
        rows: vec![vec![Button::control(ControlAction::SkipContext, "Skip This Step")]],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Event;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_platform_grid_layout() {
        let menu = platform_menu();
        assert_eq!(menu.rows.len(), 2);
        assert!(menu.rows.iter().all(|r| r.len() == 2));
        let x = &menu.rows[1][1];
        assert_eq!(x.label, "X (Twitter)");
        assert_eq!(x.data, "platform:X");
    }

    #[test]
    fn test_services_menu_ticks_selection() {
        let menu = services_menu(&["Fabric".to_string()]);
        let labels: Vec<&str> = menu.buttons().map(|b| b.label.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "OEM / Private Label",
                "Custom Branding",
                "Bulk Manufacturing",
                "✅ Premium Fabric",
                "➡️ Done Selecting ➡️",
            ]
        );
    }

    #[test]
    fn test_every_button_decodes_to_an_event() {
        let menus = [platform_menu(), tone_menu(), services_menu(&[]), context_menu()];
        for menu in &menus {
            for button in menu.buttons() {
                assert!(
                    Event::from_callback_data(&button.data).is_some(),
                    "undecodable payload {}",
                    button.data
                );
            }
        }
    }
}

//! Shape context menu model. The host renders it; the handler executes
//! the chosen command.

use fc_core::Point;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MenuCommand {
    CutShapes,
    CopyShapes,
    PasteShapes,
    DeleteShapes,
    /// Save the selection as a reusable template.
    AddPersonalShape,
}

impl MenuCommand {
    pub const ALL: [MenuCommand; 5] = [
        Self::CutShapes,
        Self::CopyShapes,
        Self::PasteShapes,
        Self::DeleteShapes,
        Self::AddPersonalShape,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::CutShapes => "Cut",
            Self::CopyShapes => "Copy",
            Self::PasteShapes => "Paste",
            Self::DeleteShapes => "Delete",
            Self::AddPersonalShape => "Save as template",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::CutShapes => "CUT_SHAPES",
            Self::CopyShapes => "COPY_SHAPES",
            Self::PasteShapes => "PASTE_SHAPES",
            Self::DeleteShapes => "DELETE_SHAPES",
            Self::AddPersonalShape => "ADD_PERSONAL_SHAPE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MenuItem {
    pub command: MenuCommand,
    pub label: &'static str,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextMenu {
    /// Screen position the menu opens at.
    pub position: Point,
    pub items: Vec<MenuItem>,
}

impl ContextMenu {
    /// Paste needs a non-empty clipboard; everything else needs a selection.
    pub fn build(position: Point, has_selection: bool, clipboard_empty: bool) -> Self {
        let items = MenuCommand::ALL
            .into_iter()
            .map(|command| MenuItem {
                command,
                label: command.label(),
                enabled: match command {
                    MenuCommand::PasteShapes => !clipboard_empty,
                    _ => has_selection,
                },
            })
            .collect();
        Self { position, items }
    }

    pub fn is_enabled(&self, command: MenuCommand) -> bool {
        self.items.iter().any(|i| i.command == command && i.enabled)
    }
}

use serde::{Deserialize, Serialize};

use super::EntityBase;

/// A reusable document template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    #[serde(flatten)]
    pub base: EntityBase,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub content: Option<String>,
}

impl Template {
    pub fn new(name: String, category: String) -> Self {
        Self {
            base: EntityBase::new(),
            name,
            description: None,
            category,
            content: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NewTemplate {
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub content: Option<String>,
}

impl NewTemplate {
    pub fn into_template(self) -> Template {
        let mut template = Template::new(self.name, self.category);
        template.description = self.description;
        template.content = self.content;
        template
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::EntityBase;

/// Step name whose entry puts a document up for signature.
pub const SIGN_STEP: &str = "Sign";
/// Step name whose entry (re)marks a document as in workflow.
pub const APPROVE_STEP: &str = "Approve";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum WorkflowStatus {
    #[default]
    Active,
    Completed,
}

impl std::fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkflowStatus::Active => write!(f, "Active"),
            WorkflowStatus::Completed => write!(f, "Completed"),
        }
    }
}

impl std::str::FromStr for WorkflowStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(WorkflowStatus::Active),
            "completed" => Ok(WorkflowStatus::Completed),
            _ => Err(format!("Invalid workflow status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    #[default]
    Pending,
    Current,
    Completed,
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StepStatus::Pending => write!(f, "pending"),
            StepStatus::Current => write!(f, "current"),
            StepStatus::Completed => write!(f, "completed"),
        }
    }
}

/// One stage of a running workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub name: String,
    pub role: String,
    pub assignee: Option<String>,
    #[serde(default)]
    pub status: StepStatus,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl WorkflowStep {
    pub fn new(name: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: role.into(),
            assignee: None,
            status: StepStatus::Pending,
            completed_at: None,
        }
    }

    pub fn complete(&mut self, at: DateTime<Utc>) {
        self.status = StepStatus::Completed;
        self.completed_at = Some(at);
    }
}

/// A workflow instance: a template's steps bound to one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    #[serde(flatten)]
    pub base: EntityBase,
    pub name: String,
    pub status: WorkflowStatus,
    pub steps: Vec<WorkflowStep>,
    pub current_step: usize,
    pub document_id: Option<Uuid>,
    pub template_id: Option<Uuid>,
}

impl Workflow {
    pub fn new(name: String, steps: Vec<WorkflowStep>) -> Self {
        Self {
            base: EntityBase::new(),
            name,
            status: WorkflowStatus::default(),
            steps,
            current_step: 0,
            document_id: None,
            template_id: None,
        }
    }

    pub fn current(&self) -> Option<&WorkflowStep> {
        self.steps.get(self.current_step)
    }

    pub fn is_last_step(&self, index: usize) -> bool {
        index + 1 == self.steps.len()
    }

    pub fn is_completed(&self) -> bool {
        self.status == WorkflowStatus::Completed
    }

    /// Check the step-status invariant: exactly one `current` step while
    /// running, all `completed` once finished, all `pending` before start.
    pub fn steps_consistent(&self) -> bool {
        let count = |status: StepStatus| self.steps.iter().filter(|s| s.status == status).count();
        match self.status {
            WorkflowStatus::Completed => count(StepStatus::Completed) == self.steps.len(),
            WorkflowStatus::Active => {
                let not_started =
                    count(StepStatus::Pending) == self.steps.len() && self.current_step == 0;
                let running = count(StepStatus::Current) == 1
                    && self
                        .current()
                        .map(|s| s.status == StepStatus::Current)
                        .unwrap_or(false);
                not_started || running
            }
        }
    }
}

/// Fields accepted when creating a workflow instance directly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NewWorkflow {
    pub name: String,
    pub steps: Vec<TemplateStep>,
    pub document_id: Option<Uuid>,
}

impl NewWorkflow {
    /// Build a workflow that has not started yet: every step pending.
    pub fn into_workflow(self) -> Workflow {
        let steps = self.steps.into_iter().map(TemplateStep::instantiate).collect();
        let mut workflow = Workflow::new(self.name, steps);
        workflow.document_id = self.document_id;
        workflow
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TemplateStatus {
    #[default]
    Draft,
    Active,
    Archived,
}

impl std::fmt::Display for TemplateStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TemplateStatus::Draft => write!(f, "draft"),
            TemplateStatus::Active => write!(f, "active"),
            TemplateStatus::Archived => write!(f, "archived"),
        }
    }
}

impl std::str::FromStr for TemplateStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "draft" => Ok(TemplateStatus::Draft),
            "active" => Ok(TemplateStatus::Active),
            "archived" => Ok(TemplateStatus::Archived),
            _ => Err(format!("Invalid template status: {}", s)),
        }
    }
}

/// A step definition inside a workflow template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateStep {
    pub name: String,
    pub role: String,
    #[serde(default)]
    pub assignee: Option<String>,
}

impl TemplateStep {
    pub fn new(name: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: role.into(),
            assignee: None,
        }
    }

    pub fn assigned(mut self, assignee: impl Into<String>) -> Self {
        self.assignee = Some(assignee.into());
        self
    }

    pub fn instantiate(self) -> WorkflowStep {
        WorkflowStep {
            name: self.name,
            role: self.role,
            assignee: self.assignee,
            status: StepStatus::Pending,
            completed_at: None,
        }
    }
}

/// Reusable named step sequence, not bound to any document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowTemplate {
    #[serde(flatten)]
    pub base: EntityBase,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub status: TemplateStatus,
    pub steps: Vec<TemplateStep>,
}

impl WorkflowTemplate {
    pub fn new(name: String, category: String, steps: Vec<TemplateStep>) -> Self {
        Self {
            base: EntityBase::new(),
            name,
            description: None,
            category,
            status: TemplateStatus::default(),
            steps,
        }
    }

    /// Whether documents may be bound to this template.
    pub fn is_bindable(&self) -> bool {
        self.status != TemplateStatus::Archived && !self.steps.is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NewWorkflowTemplate {
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub status: Option<TemplateStatus>,
    pub steps: Vec<TemplateStep>,
}

impl NewWorkflowTemplate {
    pub fn into_template(self) -> WorkflowTemplate {
        let mut template = WorkflowTemplate::new(self.name, self.category, self.steps);
        template.description = self.description;
        template.status = self.status.unwrap_or_default();
        template
    }
}

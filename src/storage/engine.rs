//! Workflow advancement.
//!
//! A document bound to a workflow visits every step exactly once, in order.
//! Entering a step named `Sign` puts the document up for signature;
//! entering `Approve` marks it in workflow. Completing the last step
//! completes the workflow. There is no way back.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::entity::{
    Action, AuditDetails, Document, DocumentStatus, ItemType, Signature, StepStatus, Workflow,
    WorkflowStatus, WorkflowStep, APPROVE_STEP, SIGN_STEP, UNASSIGNED,
};

use super::store::{position, EntityStore};

/// Result of binding a workflow template to a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowBinding {
    pub document: Document,
    pub workflow: Workflow,
    /// Present when the first step is a Sign step.
    pub signature: Option<Signature>,
}

/// Result of one advancement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Advance {
    pub document: Document,
    pub workflow: Workflow,
    pub from_step: usize,
    pub to_step: usize,
    /// The step completed was the last one.
    pub completed: bool,
    pub signature: Option<Signature>,
}

/// Apply the entry effect of `step` to `document`, returning the signature
/// request it creates, if any. Closed documents are left alone.
fn enter_step(document: &mut Document, step: &WorkflowStep) -> Option<Signature> {
    if document.status.is_closed() {
        return None;
    }
    match step.name.as_str() {
        SIGN_STEP => {
            document.status = DocumentStatus::PendingForSign;
            let assignee = step
                .assignee
                .clone()
                .unwrap_or_else(|| UNASSIGNED.to_string());
            Some(Signature::new(
                document.base.id,
                document.name.clone(),
                assignee,
            ))
        }
        APPROVE_STEP => {
            document.status = DocumentStatus::InWorkflow;
            None
        }
        _ => None,
    }
}

impl EntityStore {
    /// Bind a workflow template to a draft document ("add to workflow").
    ///
    /// Creates a running workflow instance with the template's steps, the
    /// first one current. Returns `None` when the document is missing or not
    /// a draft, or the template is missing, archived or empty.
    pub fn bind_workflow(
        &mut self,
        document_id: &Uuid,
        template_id: &Uuid,
    ) -> Option<WorkflowBinding> {
        let Some(doc_idx) = position(&self.documents, document_id) else {
            debug!(%document_id, "Document not found; bind skipped");
            return None;
        };
        if self.documents[doc_idx].status != DocumentStatus::Draft {
            debug!(%document_id, status = %self.documents[doc_idx].status, "Only drafts can be bound");
            return None;
        }
        let Some(template) = self.get_workflow_template(template_id) else {
            debug!(%template_id, "Workflow template not found; bind skipped");
            return None;
        };
        if !template.is_bindable() {
            debug!(%template_id, status = %template.status, "Workflow template not bindable");
            return None;
        }

        let mut document = self.documents[doc_idx].clone();
        let steps = template.steps.into_iter().map(|s| s.instantiate()).collect();
        let mut workflow = Workflow::new(format!("{} - {}", template.name, document.name), steps);
        workflow.document_id = Some(document.base.id);
        workflow.template_id = Some(template.base.id);
        workflow.steps[0].status = StepStatus::Current;

        document.workflow_id = Some(workflow.base.id);
        document.current_step = 0;
        document.status = DocumentStatus::InWorkflow;
        let signature = enter_step(&mut document, &workflow.steps[0]);
        document.base.touch();

        self.documents[doc_idx] = document.clone();
        self.insert_workflow(workflow.clone());
        info!(
            document_id = %document.base.id,
            workflow_id = %workflow.base.id,
            "Document bound to workflow"
        );
        self.record(
            ItemType::Document,
            Action::Bound,
            document.base.id,
            &document.name,
            AuditDetails::Document {
                document: document.clone(),
            },
        );
        if let Some(signature) = &signature {
            self.insert_signature(signature.clone());
        }

        Some(WorkflowBinding {
            document,
            workflow,
            signature,
        })
    }

    /// Move a document to the next step of its bound workflow.
    ///
    /// Returns `None`, changing nothing, when the document is missing, not
    /// bound, declined or recalled, waiting for its signature, or its
    /// workflow is missing or already completed.
    pub fn advance_document(&mut self, document_id: &Uuid) -> Option<Advance> {
        let Some(doc_idx) = position(&self.documents, document_id) else {
            debug!(%document_id, "Document not found; advance skipped");
            return None;
        };
        let current = &self.documents[doc_idx];
        let Some(workflow_id) = current.workflow_id else {
            debug!(%document_id, "Document has no workflow; advance skipped");
            return None;
        };
        if current.status == DocumentStatus::PendingForSign {
            debug!(%document_id, "Document awaits signature; advance skipped");
            return None;
        }
        if current.status.is_closed() {
            debug!(%document_id, status = %current.status, "Document closed; advance skipped");
            return None;
        }
        let Some(wf_idx) = position(&self.workflows, &workflow_id) else {
            debug!(%document_id, %workflow_id, "Bound workflow not found; advance skipped");
            return None;
        };
        if self.workflows[wf_idx].is_completed() {
            debug!(%workflow_id, "Workflow already completed; advance skipped");
            return None;
        }
        let from = self.workflows[wf_idx].current_step;
        if from >= self.workflows[wf_idx].steps.len() {
            debug!(%workflow_id, step = from, "Workflow past its final step; advance skipped");
            return None;
        }

        let mut document = current.clone();
        let mut workflow = self.workflows[wf_idx].clone();
        workflow.steps[from].complete(Utc::now());

        let completed = workflow.is_last_step(from);
        let (to, signature) = if completed {
            workflow.status = WorkflowStatus::Completed;
            (from, None)
        } else {
            let to = from + 1;
            workflow.steps[to].status = StepStatus::Current;
            workflow.current_step = to;
            document.current_step = to;
            (to, enter_step(&mut document, &workflow.steps[to]))
        };
        workflow.base.touch();
        document.base.touch();

        self.documents[doc_idx] = document.clone();
        self.workflows[wf_idx] = workflow.clone();
        info!(
            %document_id,
            %workflow_id,
            from_step = from,
            to_step = to,
            completed,
            status = %document.status,
            "Document advanced"
        );
        self.record(
            ItemType::Document,
            Action::Advanced,
            document.base.id,
            &document.name,
            AuditDetails::Advance {
                document: document.clone(),
                workflow: workflow.clone(),
                from_step: from,
                to_step: to,
            },
        );
        if let Some(signature) = &signature {
            self.insert_signature(signature.clone());
        }

        Some(Advance {
            document,
            workflow,
            from_step: from,
            to_step: to,
            completed,
            signature,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{
        NewDocument, NewWorkflowTemplate, SignatureStatus, TemplateStatus, TemplateStep,
    };
    use crate::storage::updates::{SignatureUpdate, WorkflowTemplateUpdate};
    use chrono::Duration;

    fn template(store: &mut EntityStore, names: &[&str]) -> Uuid {
        let steps = names
            .iter()
            .map(|n| TemplateStep::new(*n, "Officer").assigned(format!("{} owner", n)))
            .collect();
        store
            .create_workflow_template(NewWorkflowTemplate {
                name: "Standard".to_string(),
                category: "Loans".to_string(),
                status: Some(TemplateStatus::Active),
                steps,
                ..Default::default()
            })
            .base
            .id
    }

    fn log_count(store: &EntityStore) -> (usize, usize) {
        (store.recent_activities(None).len(), store.audit_logs().len())
    }

    #[test]
    fn test_sign_scenario() {
        let mut store = EntityStore::new();
        let doc = store.create_document(NewDocument::named("A.pdf"));
        let tpl = template(&mut store, &["Draft", "Review", "Approve", "Sign"]);

        let binding = store.bind_workflow(&doc.base.id, &tpl).unwrap();
        assert_eq!(binding.document.status, DocumentStatus::InWorkflow);
        assert!(binding.signature.is_none());

        for _ in 0..3 {
            store.advance_document(&doc.base.id).unwrap();
        }

        let doc = store.get_document(&doc.base.id).unwrap();
        assert_eq!(doc.current_step, 3);
        assert_eq!(doc.status, DocumentStatus::PendingForSign);

        let signatures = store.signatures_for_document(&doc.base.id);
        assert_eq!(signatures.len(), 1);
        let sig = &signatures[0];
        assert_eq!(sig.status, SignatureStatus::Pending);
        assert_eq!(sig.assignee, "Sign owner");
        assert_eq!(sig.due_date - sig.base.created_at, Duration::days(7));

        let workflow = store.get_workflow(&binding.workflow.base.id).unwrap();
        assert_eq!(workflow.status, WorkflowStatus::Active);
        assert!(workflow.steps_consistent());

        store.update_signature(&sig.base.id, SignatureUpdate::signed()).unwrap();
        assert_eq!(
            store.get_document(&doc.base.id).unwrap().status,
            DocumentStatus::Signed
        );
    }

    #[test]
    fn test_second_sign_step_requests_another_signature() {
        let mut store = EntityStore::new();
        let doc = store.create_document(NewDocument::named("A.pdf"));
        let tpl = template(&mut store, &["Draft", "Sign", "Review", "Sign"]);
        let binding = store.bind_workflow(&doc.base.id, &tpl).unwrap();

        store.advance_document(&doc.base.id).unwrap();
        let first = store.signatures_for_document(&doc.base.id).remove(0);
        store.update_signature(&first.base.id, SignatureUpdate::signed()).unwrap();

        let advance = store.advance_document(&doc.base.id).unwrap();
        assert_eq!(advance.to_step, 2);
        assert_eq!(advance.document.status, DocumentStatus::Signed);

        let advance = store.advance_document(&doc.base.id).unwrap();
        assert_eq!(advance.to_step, 3);
        assert_eq!(advance.document.status, DocumentStatus::PendingForSign);
        let second = advance.signature.unwrap();
        assert_ne!(second.base.id, first.base.id);
        assert_eq!(second.status, SignatureStatus::Pending);
        assert_eq!(store.signatures_for_document(&doc.base.id).len(), 2);

        assert!(store.advance_document(&doc.base.id).is_none());
        store.update_signature(&second.base.id, SignatureUpdate::signed()).unwrap();
        assert!(store.advance_document(&doc.base.id).unwrap().completed);
        let workflow = store.get_workflow(&binding.workflow.base.id).unwrap();
        assert_eq!(workflow.status, WorkflowStatus::Completed);
        assert!(workflow.steps_consistent());
    }

    #[test]
    fn test_recalled_document_cannot_advance() {
        let mut store = EntityStore::new();
        let doc = store.create_document(NewDocument::named("A.pdf"));
        let tpl = template(&mut store, &["Draft", "Review", "Sign"]);
        store.bind_workflow(&doc.base.id, &tpl).unwrap();
        store
            .update_document(
                &doc.base.id,
                crate::storage::updates::DocumentUpdate::status(DocumentStatus::Recalled),
            )
            .unwrap();

        let before = log_count(&store);
        assert!(store.advance_document(&doc.base.id).is_none());
        assert_eq!(log_count(&store), before);
    }

    #[test]
    fn test_pending_for_sign_blocks_advance() {
        let mut store = EntityStore::new();
        let doc = store.create_document(NewDocument::named("A.pdf"));
        let tpl = template(&mut store, &["Review", "Sign", "Archive"]);
        store.bind_workflow(&doc.base.id, &tpl).unwrap();
        store.advance_document(&doc.base.id).unwrap();

        let before = log_count(&store);
        assert!(store.advance_document(&doc.base.id).is_none());
        assert_eq!(log_count(&store), before);
        assert_eq!(store.get_document(&doc.base.id).unwrap().current_step, 1);
    }

    #[test]
    fn test_completing_last_step_completes_workflow() {
        let mut store = EntityStore::new();
        let doc = store.create_document(NewDocument::named("A.pdf"));
        let tpl = template(&mut store, &["Draft", "Sign"]);
        let binding = store.bind_workflow(&doc.base.id, &tpl).unwrap();

        store.advance_document(&doc.base.id).unwrap();
        let sig = store.signatures_for_document(&doc.base.id).remove(0);
        store.update_signature(&sig.base.id, SignatureUpdate::signed()).unwrap();

        let advance = store.advance_document(&doc.base.id).unwrap();
        assert!(advance.completed);
        assert_eq!(advance.from_step, 1);
        assert_eq!(advance.to_step, 1);

        let workflow = store.get_workflow(&binding.workflow.base.id).unwrap();
        let doc = store.get_document(&doc.base.id).unwrap();
        assert_eq!(workflow.status, WorkflowStatus::Completed);
        assert_eq!(doc.current_step, workflow.steps.len() - 1);
        assert_eq!(doc.status, DocumentStatus::Signed);
        assert!(workflow
            .steps
            .iter()
            .all(|s| s.status == StepStatus::Completed && s.completed_at.is_some()));
        assert!(workflow.steps_consistent());
    }

    #[test]
    fn test_advancing_completed_workflow_is_noop() {
        let mut store = EntityStore::new();
        let doc = store.create_document(NewDocument::named("A.pdf"));
        let tpl = template(&mut store, &["Review"]);
        store.bind_workflow(&doc.base.id, &tpl).unwrap();
        assert!(store.advance_document(&doc.base.id).unwrap().completed);

        let before = log_count(&store);
        assert!(store.advance_document(&doc.base.id).is_none());
        assert_eq!(log_count(&store), before);
    }

    #[test]
    fn test_approve_step_marks_in_workflow() {
        let mut store = EntityStore::new();
        let doc = store.create_document(NewDocument::named("A.pdf"));
        let tpl = template(&mut store, &["Draft", "Approve", "Archive"]);
        store.bind_workflow(&doc.base.id, &tpl).unwrap();

        let advance = store.advance_document(&doc.base.id).unwrap();
        assert_eq!(advance.document.status, DocumentStatus::InWorkflow);
        assert!(advance.signature.is_none());

        let advance = store.advance_document(&doc.base.id).unwrap();
        assert_eq!(advance.document.status, DocumentStatus::InWorkflow);
        assert_eq!(advance.to_step, 2);
    }

    #[test]
    fn test_step_names_match_exactly() {
        let mut store = EntityStore::new();
        let doc = store.create_document(NewDocument::named("A.pdf"));
        let tpl = template(&mut store, &["Draft", "sign", "Done"]);
        store.bind_workflow(&doc.base.id, &tpl).unwrap();

        let advance = store.advance_document(&doc.base.id).unwrap();
        assert_eq!(advance.document.status, DocumentStatus::InWorkflow);
        assert!(store.list_signatures().is_empty());
    }

    #[test]
    fn test_unassigned_sign_step() {
        let mut store = EntityStore::new();
        let doc = store.create_document(NewDocument::named("A.pdf"));
        let tpl = store
            .create_workflow_template(NewWorkflowTemplate {
                name: "Quick".to_string(),
                category: "Loans".to_string(),
                steps: vec![TemplateStep::new("Sign", "Manager")],
                ..Default::default()
            })
            .base
            .id;

        let binding = store.bind_workflow(&doc.base.id, &tpl).unwrap();
        let signature = binding.signature.unwrap();
        assert_eq!(signature.assignee, UNASSIGNED);
        assert_eq!(binding.document.status, DocumentStatus::PendingForSign);
    }

    #[test]
    fn test_bind_logs_workflow_and_document() {
        let mut store = EntityStore::new();
        let doc = store.create_document(NewDocument::named("A.pdf"));
        let tpl = template(&mut store, &["Draft", "Sign"]);
        let before = log_count(&store);

        let binding = store.bind_workflow(&doc.base.id, &tpl).unwrap();
        assert_eq!(log_count(&store), (before.0 + 2, before.1 + 2));

        let logs = store.audit_logs();
        assert_eq!(logs[0].action, Action::Bound);
        assert_eq!(logs[0].item_id, doc.base.id.to_string());
        assert_eq!(logs[1].item_type, ItemType::Workflow);
        assert_eq!(logs[1].item_id, binding.workflow.base.id.to_string());
    }

    #[test]
    fn test_advance_into_sign_logs_advance_and_signature() {
        let mut store = EntityStore::new();
        let doc = store.create_document(NewDocument::named("A.pdf"));
        let tpl = template(&mut store, &["Draft", "Sign"]);
        store.bind_workflow(&doc.base.id, &tpl).unwrap();
        let before = log_count(&store);

        store.advance_document(&doc.base.id).unwrap();
        assert_eq!(log_count(&store), (before.0 + 2, before.1 + 2));
        let logs = store.audit_logs();
        assert_eq!(logs[0].item_type, ItemType::Signature);
        assert!(matches!(
            logs[1].details,
            AuditDetails::Advance {
                from_step: 0,
                to_step: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_bind_preconditions() {
        let mut store = EntityStore::new();
        let doc = store.create_document(NewDocument::named("A.pdf"));
        let tpl = template(&mut store, &["Draft", "Sign"]);

        assert!(store.bind_workflow(&Uuid::new_v4(), &tpl).is_none());
        assert!(store.bind_workflow(&doc.base.id, &Uuid::new_v4()).is_none());

        store.update_workflow_template(
            &tpl,
            WorkflowTemplateUpdate {
                status: Some(TemplateStatus::Archived),
                ..Default::default()
            },
        );
        let before = log_count(&store);
        assert!(store.bind_workflow(&doc.base.id, &tpl).is_none());
        assert_eq!(log_count(&store), before);

        let active = template(&mut store, &["Draft"]);
        store.bind_workflow(&doc.base.id, &active).unwrap();
        assert!(store.bind_workflow(&doc.base.id, &active).is_none());
    }

    #[test]
    fn test_unbound_or_missing_document_cannot_advance() {
        let mut store = EntityStore::new();
        let doc = store.create_document(NewDocument::named("A.pdf"));
        assert!(store.advance_document(&doc.base.id).is_none());
        assert!(store.advance_document(&Uuid::new_v4()).is_none());
        assert_eq!(log_count(&store), (1, 1));
    }

    #[test]
    fn test_each_step_visited_once_in_order() {
        let mut store = EntityStore::new();
        let doc = store.create_document(NewDocument::named("A.pdf"));
        let names = ["Draft", "Review", "Check", "Archive"];
        let tpl = template(&mut store, &names);
        let binding = store.bind_workflow(&doc.base.id, &tpl).unwrap();

        let mut visited = vec![0];
        while let Some(advance) = store.advance_document(&doc.base.id) {
            let workflow = store.get_workflow(&binding.workflow.base.id).unwrap();
            assert!(workflow.steps_consistent());
            if !advance.completed {
                visited.push(advance.to_step);
            }
        }
        assert_eq!(visited, vec![0, 1, 2, 3]);
        let workflow = store.get_workflow(&binding.workflow.base.id).unwrap();
        assert_eq!(workflow.status, WorkflowStatus::Completed);
    }
}

//! Demo data for a fresh store.
//!
//! Seeding writes the collections directly and records no log entries, so a
//! seeded store starts with an empty audit trail.

use chrono::{Duration, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::entity::{
    DocumentStatus, NewAuthorizer, NewCategory, NewDepartment, NewDocument, NewEmailTemplate,
    NewRole, NewTemplate, NewWorkflowTemplate, SettingsSection, Subscription, SubscriptionPlan,
    TemplateStatus, TemplateStep,
};

use super::store::EntityStore;

/// Name of the seeded four-step approval template.
pub const STANDARD_TEMPLATE: &str = "Standard Approval";

impl EntityStore {
    /// A store populated with demo records.
    pub fn seeded() -> Self {
        let mut store = Self::new();
        store.seed();
        store
    }

    fn seed(&mut self) {
        let retail = NewDepartment {
            name: "Retail Banking".to_string(),
            description: Some("Branch lending and accounts".to_string()),
            head: Some("Priya Nair".to_string()),
        }
        .into_department();
        let retail_id = retail.base.id;
        self.departments.push(retail);
        self.departments.push(
            NewDepartment {
                name: "Operations".to_string(),
                description: Some("Back-office processing".to_string()),
                head: None,
            }
            .into_department(),
        );

        for (name, permissions) in [
            ("Administrator", vec!["documents:*", "workflows:*", "settings:*"]),
            ("Checker", vec!["documents:read", "workflows:advance"]),
            ("Signer", vec!["documents:read", "signatures:sign"]),
        ] {
            self.roles.push(
                NewRole {
                    name: name.to_string(),
                    description: None,
                    permissions: permissions.into_iter().map(String::from).collect(),
                }
                .into_role(),
            );
        }

        self.authorizers.push(
            NewAuthorizer {
                name: "Marta Silva".to_string(),
                email: "marta.silva@example.com".to_string(),
                department_id: Some(retail_id),
                signing_limit: Some(250_000.0),
            }
            .into_authorizer(),
        );

        for name in ["Loans", "Accounts", "Compliance"] {
            self.categories.push(
                NewCategory {
                    name: name.to_string(),
                    description: None,
                }
                .into_category(),
            );
        }

        self.workflow_templates.push(
            NewWorkflowTemplate {
                name: STANDARD_TEMPLATE.to_string(),
                description: Some("Maker, checker, approver, signer".to_string()),
                category: "Loans".to_string(),
                status: Some(TemplateStatus::Active),
                steps: vec![
                    TemplateStep::new("Draft", "Maker").assigned("Leo Park"),
                    TemplateStep::new("Review", "Checker").assigned("Ines Duarte"),
                    TemplateStep::new("Approve", "Approver").assigned("Priya Nair"),
                    TemplateStep::new("Sign", "Signer").assigned("Marta Silva"),
                ],
            }
            .into_template(),
        );
        self.workflow_templates.push(
            NewWorkflowTemplate {
                name: "Quick Sign".to_string(),
                description: None,
                category: "Accounts".to_string(),
                status: Some(TemplateStatus::Active),
                steps: vec![
                    TemplateStep::new("Review", "Checker"),
                    TemplateStep::new("Sign", "Signer").assigned("Marta Silva"),
                ],
            }
            .into_template(),
        );

        self.templates.push(
            NewTemplate {
                name: "Loan Agreement".to_string(),
                description: Some("Standard secured loan agreement".to_string()),
                category: "Loans".to_string(),
                content: None,
            }
            .into_template(),
        );

        for (name, customer, amount) in [
            ("Loan-2041.pdf", "Ana Costa", Some(18_500.0)),
            ("Account-Opening-7781.pdf", "Rui Almeida", None),
        ] {
            let mut new = NewDocument::named(name);
            new.status = Some(DocumentStatus::Draft);
            new.customer_name = Some(customer.to_string());
            new.branch = Some("Downtown".to_string());
            new.account_number = Some(format!("AC-{}", &Uuid::new_v4().simple().to_string()[..8]));
            new.amount = amount;
            self.documents.push(new.into_document());
        }

        self.email_templates.push(
            NewEmailTemplate {
                name: "Signature request".to_string(),
                event: "signature_requested".to_string(),
                subject: "Document awaiting your signature".to_string(),
                body: "Hello {{assignee}}, {{document}} is ready for signing.".to_string(),
                enabled: true,
            }
            .into_email_template(),
        );

        let basic = SubscriptionPlan {
            id: Uuid::new_v4(),
            name: "Basic".to_string(),
            monthly_price: 29.0,
            max_users: 5,
            max_documents: Some(500),
            features: vec!["workflows".to_string()],
        };
        let business = SubscriptionPlan {
            id: Uuid::new_v4(),
            name: "Business".to_string(),
            monthly_price: 99.0,
            max_users: 50,
            max_documents: None,
            features: vec![
                "workflows".to_string(),
                "audit_export".to_string(),
                "dsc".to_string(),
            ],
        };
        self.subscription = Some(Subscription {
            plan_id: business.id,
            status: "active".to_string(),
            seats: 12,
            renews_at: Some(Utc::now() + Duration::days(30)),
        });
        self.subscription_plans.extend([basic, business]);

        self.settings.insert(
            SettingsSection::Customization,
            json!({ "date_format": "YYYY-MM-DD", "language": "en" }),
        );
        self.settings.insert(
            SettingsSection::Pdf,
            json!({ "page_size": "A4", "watermark": false }),
        );
        self.settings.insert(
            SettingsSection::Branding,
            json!({ "company_name": "Signdesk Demo Bank", "primary_color": "#1f4e79" }),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_store_has_demo_data_and_no_logs() {
        let store = EntityStore::seeded();
        assert_eq!(store.list_documents().len(), 2);
        assert!(store
            .list_workflow_templates()
            .iter()
            .any(|t| t.name == STANDARD_TEMPLATE));
        assert!(store.get_subscription().is_some());
        assert!(store.audit_logs().is_empty());
        assert!(store.recent_activities(None).is_empty());
    }

    #[test]
    fn test_seeded_documents_can_run_standard_workflow() {
        let mut store = EntityStore::seeded();
        let doc = store.list_documents().remove(0);
        let tpl = store
            .list_workflow_templates()
            .into_iter()
            .find(|t| t.name == STANDARD_TEMPLATE)
            .unwrap();

        store.bind_workflow(&doc.base.id, &tpl.base.id).unwrap();
        for _ in 0..3 {
            store.advance_document(&doc.base.id).unwrap();
        }
        let doc = store.get_document(&doc.base.id).unwrap();
        assert_eq!(doc.status, DocumentStatus::PendingForSign);
        assert_eq!(store.signatures_for_document(&doc.base.id)[0].assignee, "Marta Silva");
    }
}

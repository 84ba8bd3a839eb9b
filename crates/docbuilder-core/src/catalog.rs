//! Template catalog: default sections, pricing and compliance checklist per
//! (document type, service type).
//!
//! Lookup is a plain map keyed by the pair. Adding a combination means
//! registering another [`Template`]; nothing that consumes the catalog
//! branches on the key.

use std::collections::HashMap;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use shared_types::{DocumentType, PricingLineItem, Section, ServiceType};

use crate::compliance::ComplianceItem;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionTemplate {
    pub key: String,
    pub title: String,
    /// HTML-ish body with `{{TOKEN}}` placeholders
    pub content: String,
    pub required: bool,
    pub locked: bool,
}

impl SectionTemplate {
    fn new(key: &str, title: &str, content: String) -> Self {
        Self {
            key: key.to_string(),
            title: title.to_string(),
            content,
            required: false,
            locked: false,
        }
    }

    fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Legal boilerplate: required and not editable.
    fn locked(mut self) -> Self {
        self.required = true;
        self.locked = true;
        self
    }

    pub fn to_section(&self, sort_order: u32) -> Section {
        Section {
            key: self.key.clone(),
            title: self.title.clone(),
            content: self.content.clone(),
            required: self.required,
            locked: self.locked,
            sort_order,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItemTemplate {
    pub description: String,
    pub quantity: f64,
    pub unit_price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub document_type: DocumentType,
    pub service_type: ServiceType,
    /// May contain placeholders
    pub title: String,
    pub sections: Vec<SectionTemplate>,
    pub pricing: Vec<LineItemTemplate>,
    pub compliance: Vec<ComplianceItem>,
}

impl Template {
    pub fn key(&self) -> (DocumentType, ServiceType) {
        (self.document_type, self.service_type)
    }

    /// Sections numbered densely in template order.
    pub fn build_sections(&self) -> Vec<Section> {
        self.sections
            .iter()
            .enumerate()
            .map(|(i, s)| s.to_section(i as u32))
            .collect()
    }

    pub fn build_line_items(&self) -> Vec<PricingLineItem> {
        self.pricing
            .iter()
            .enumerate()
            .map(|(i, t)| {
                PricingLineItem::new(
                    format!("item_{}", i + 1),
                    t.description.clone(),
                    t.quantity,
                    t.unit_price,
                )
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct TemplateCatalog {
    templates: HashMap<(DocumentType, ServiceType), Template>,
}

lazy_static! {
    static ref BUILTIN: TemplateCatalog = TemplateCatalog::build_builtin();
}

impl TemplateCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The shipped catalog. Clone it to register additional templates.
    pub fn builtin() -> &'static TemplateCatalog {
        &BUILTIN
    }

    pub fn lookup(
        &self,
        document_type: DocumentType,
        service_type: ServiceType,
    ) -> Option<&Template> {
        self.templates.get(&(document_type, service_type))
    }

    /// Add or replace the template for its key, returning the previous one.
    pub fn register(&mut self, template: Template) -> Option<Template> {
        self.templates.insert(template.key(), template)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Covered combinations in enum order.
    pub fn combinations(&self) -> Vec<(DocumentType, ServiceType)> {
        let mut keys = Vec::new();
        for dt in DocumentType::ALL {
            for st in ServiceType::ALL {
                if self.templates.contains_key(&(dt, st)) {
                    keys.push((dt, st));
                }
            }
        }
        keys
    }

    fn build_builtin() -> Self {
        let mut catalog = Self::new();
        for profile in PROFILES {
            catalog.register(proposal(profile));
            catalog.register(contract(profile));
            if let Some(support) = &profile.support {
                catalog.register(sla(profile, support));
            }
        }
        catalog
    }
}

// ============================================================================
// Built-in content
// ============================================================================

struct SupportProfile {
    coverage: &'static str,
    uptime: &'static str,
    /// (priority, response target)
    response: &'static [(&'static str, &'static str)],
    pricing: &'static [(&'static str, f64, f64)],
}

struct ServiceProfile {
    service: ServiceType,
    headline: &'static str,
    scope: &'static str,
    deliverables: &'static [&'static str],
    timeline: &'static str,
    pricing: &'static [(&'static str, f64, f64)],
    support: Option<SupportProfile>,
    compliance: &'static [(&'static str, &'static str, &'static str)],
}

const ACCESSIBILITY: (&str, &str, &str) = (
    "aoda_accessibility",
    "Accessibility (AODA)",
    "Deliverables target WCAG 2.0 Level AA as required for Ontario organizations.",
);

const PROFILES: &[ServiceProfile] = &[
    ServiceProfile {
        service: ServiceType::WebsitePwaBuild,
        headline: "Website & Progressive Web App",
        scope: "a responsive marketing website together with an installable progressive web app \
                that shares its design system, content model and hosting",
        deliverables: &[
            "Discovery workshop and sitemap",
            "Responsive website (up to 10 templates)",
            "Installable PWA with offline support and push notifications",
            "Content management system with editor training",
            "Launch, analytics and search console setup",
        ],
        timeline: "Discovery and design take three weeks, development six weeks and testing and \
                   launch two weeks, for roughly eleven weeks from kickoff.",
        pricing: &[
            ("Discovery & UX design", 1.0, 4500.0),
            ("Website development", 1.0, 9500.0),
            ("PWA development", 1.0, 7500.0),
            ("CMS setup & training", 1.0, 1800.0),
        ],
        support: Some(SupportProfile {
            coverage: "hosting, security patching, uptime monitoring and content updates for the \
                       website and the PWA",
            uptime: "99.9%",
            response: &[
                ("Critical (site down)", "1 business hour"),
                ("High", "4 business hours"),
                ("Normal", "2 business days"),
            ],
            pricing: &[
                ("Managed hosting (monthly)", 12.0, 150.0),
                ("Maintenance & updates (monthly)", 12.0, 350.0),
            ],
        }),
        compliance: &[ACCESSIBILITY],
    },
    ServiceProfile {
        service: ServiceType::WebsiteOnly,
        headline: "Website Development",
        scope: "a responsive, search-optimized marketing website built on a managed content \
                management system",
        deliverables: &[
            "Discovery workshop and sitemap",
            "Responsive website (up to 8 templates)",
            "Content management system with editor training",
            "On-page SEO and analytics setup",
        ],
        timeline: "Design takes two weeks, development four weeks and launch one week, for \
                   roughly seven weeks from kickoff.",
        pricing: &[
            ("Discovery & design", 1.0, 3500.0),
            ("Website development", 1.0, 8000.0),
            ("CMS setup & training", 1.0, 1500.0),
        ],
        support: Some(SupportProfile {
            coverage: "hosting, security patching, uptime monitoring and minor content updates",
            uptime: "99.9%",
            response: &[
                ("Critical (site down)", "1 business hour"),
                ("Normal", "2 business days"),
            ],
            pricing: &[
                ("Managed hosting (monthly)", 12.0, 100.0),
                ("Maintenance & updates (monthly)", 12.0, 250.0),
            ],
        }),
        compliance: &[ACCESSIBILITY],
    },
    ServiceProfile {
        service: ServiceType::PwaOnly,
        headline: "Progressive Web App",
        scope: "an installable progressive web app with offline support, background sync and \
                push notifications",
        deliverables: &[
            "Product discovery and user flows",
            "UI design for mobile and desktop",
            "PWA build with service worker and web manifest",
            "App store style install prompts and analytics",
        ],
        timeline: "Design takes three weeks and development six weeks, followed by a two week \
                   beta, for roughly eleven weeks from kickoff.",
        pricing: &[
            ("Product discovery & UX", 1.0, 4000.0),
            ("PWA development", 1.0, 11000.0),
            ("Beta testing & launch", 1.0, 1500.0),
        ],
        support: Some(SupportProfile {
            coverage: "hosting, dependency updates, browser compatibility fixes and monitoring \
                       of the PWA",
            uptime: "99.9%",
            response: &[
                ("Critical (app unavailable)", "1 business hour"),
                ("High", "4 business hours"),
                ("Normal", "2 business days"),
            ],
            pricing: &[
                ("Managed hosting (monthly)", 12.0, 150.0),
                ("Maintenance & updates (monthly)", 12.0, 400.0),
            ],
        }),
        compliance: &[ACCESSIBILITY],
    },
    ServiceProfile {
        service: ServiceType::Cybersecurity,
        headline: "Cybersecurity Assessment",
        scope: "an external and internal security assessment, including vulnerability scanning, \
                penetration testing of agreed systems and a prioritized remediation plan",
        deliverables: &[
            "Scoping call and rules of engagement",
            "External and internal vulnerability scans",
            "Penetration test of in-scope applications",
            "Executive summary and technical findings report",
            "Remediation workshop and retest of critical findings",
        ],
        timeline: "Scoping takes one week, testing two weeks and reporting one week, for roughly \
                   four weeks from signed authorization.",
        pricing: &[
            ("Scoping & rules of engagement", 1.0, 1200.0),
            ("Vulnerability assessment", 1.0, 4800.0),
            ("Penetration testing (days)", 5.0, 1600.0),
            ("Reporting & remediation workshop", 1.0, 2000.0),
        ],
        support: Some(SupportProfile {
            coverage: "continuous vulnerability monitoring, quarterly scans and incident response \
                       advisory",
            uptime: "99.5%",
            response: &[
                ("Active incident", "30 minutes, 24/7"),
                ("High", "4 hours"),
                ("Normal", "1 business day"),
            ],
            pricing: &[
                ("Managed monitoring (monthly)", 12.0, 900.0),
                ("Quarterly vulnerability scan", 4.0, 1500.0),
            ],
        }),
        compliance: &[(
            "testing_authorization",
            "Testing authorization",
            "Written authorization for security testing covers every in-scope system.",
        )],
    },
    ServiceProfile {
        service: ServiceType::GraphicDesign,
        headline: "Brand & Graphic Design",
        scope: "a brand identity refresh covering logo, colour palette, typography and a set of \
                print and digital templates",
        deliverables: &[
            "Brand discovery questionnaire and moodboards",
            "Logo concepts with two rounds of revisions",
            "Brand guidelines document",
            "Business card, letterhead and social media templates",
        ],
        timeline: "Concepts are presented after two weeks and final files are delivered within \
                   five weeks of kickoff.",
        pricing: &[
            ("Brand discovery", 1.0, 900.0),
            ("Logo design", 1.0, 2400.0),
            ("Brand guidelines", 1.0, 1200.0),
            ("Template set", 1.0, 1100.0),
        ],
        support: None,
        compliance: &[(
            "asset_licensing",
            "Asset licensing",
            "Stock imagery and font licences are identified and transferable to the client.",
        )],
    },
];

fn bullet_list(items: &[&str]) -> String {
    let mut html = String::from("<ul>");
    for item in items {
        html.push_str("<li>");
        html.push_str(item);
        html.push_str("</li>");
    }
    html.push_str("</ul>");
    html
}

fn line_items(rows: &[(&str, f64, f64)]) -> Vec<LineItemTemplate> {
    rows.iter()
        .map(|(description, quantity, unit_price)| LineItemTemplate {
            description: description.to_string(),
            quantity: *quantity,
            unit_price: *unit_price,
        })
        .collect()
}

fn compliance_items(
    common: &[(&str, &str, &str)],
    profile: &ServiceProfile,
) -> Vec<ComplianceItem> {
    common
        .iter()
        .chain(profile.compliance.iter())
        .map(|(key, label, description)| ComplianceItem::new(key, label, description))
        .collect()
}

const PRIVACY: (&str, &str, &str) = (
    "pipeda_privacy",
    "Privacy (PIPEDA)",
    "Personal information is collected only for this engagement and handled under PIPEDA.",
);

const HST: (&str, &str, &str) = (
    "hst_disclosure",
    "HST disclosure",
    "Prices are shown before HST and the tax treatment is stated.",
);

fn privacy_section() -> SectionTemplate {
    SectionTemplate::new(
        "privacy",
        "Privacy & Data Protection",
        "<p>Each party will handle personal information it receives under this agreement in \
         accordance with the Personal Information Protection and Electronic Documents Act \
         (PIPEDA). Personal information will be used only to deliver the services, will be \
         protected by reasonable safeguards and will be returned or destroyed at the end of the \
         engagement on request.</p>"
            .to_string(),
    )
    .locked()
}

fn proposal(p: &ServiceProfile) -> Template {
    let sections = vec![
        SectionTemplate::new(
            "executive_summary",
            "Executive Summary",
            format!(
                "<p>Prepared for {{{{CLIENT_NAME}}}} on {{{{DATE}}}}.</p>\
                 <p>CipherX Solutions proposes to deliver {}. This proposal outlines the scope, \
                 deliverables, timeline and investment for the engagement.</p>",
                p.scope
            ),
        )
        .required(),
        SectionTemplate::new(
            "scope_of_work",
            "Scope of Work",
            format!(
                "<p>The engagement covers {}.</p><p>Work will be performed for \
                 {{{{CLIENT_NAME}}}} at {{{{CLIENT_ADDRESS}}}} and remotely.</p>",
                p.scope
            ),
        )
        .required(),
        SectionTemplate::new("deliverables", "Deliverables", bullet_list(p.deliverables)),
        SectionTemplate::new("timeline", "Timeline", format!("<p>{}</p>", p.timeline)),
        SectionTemplate::new(
            "why_cipherx",
            "Why CipherX",
            "<p>We are a Canadian studio combining design, engineering and security under one \
             roof. Every project has a single accountable lead and weekly progress reports.</p>"
                .to_string(),
        ),
        SectionTemplate::new(
            "terms",
            "Terms & Validity",
            "<p>This proposal is valid until {{EXPIRY_DATE}}. Prices are in Canadian dollars and \
             exclude HST. A 50% deposit is due on acceptance and the balance on delivery.</p>"
                .to_string(),
        )
        .locked(),
    ];
    Template {
        document_type: DocumentType::Proposal,
        service_type: p.service,
        title: format!("{} Proposal for {{{{CLIENT_NAME}}}}", p.headline),
        sections,
        pricing: line_items(p.pricing),
        compliance: compliance_items(
            &[
                PRIVACY,
                HST,
                (
                    "casl_consent",
                    "CASL consent",
                    "The client agreed to receive commercial electronic messages about this proposal.",
                ),
            ],
            p,
        ),
    }
}

fn contract(p: &ServiceProfile) -> Template {
    let sections = vec![
        SectionTemplate::new(
            "parties",
            "Parties",
            "<p>This agreement is made on {{DATE}} between CipherX Solutions (the \
             \"Provider\") and {{CLIENT_NAME}}, {{CLIENT_ADDRESS}} (the \"Client\").</p>"
                .to_string(),
        )
        .required(),
        SectionTemplate::new(
            "services",
            "Services",
            format!(
                "<p>The Provider will deliver {}, including:</p>{}",
                p.scope,
                bullet_list(p.deliverables)
            ),
        )
        .required(),
        SectionTemplate::new(
            "payment_terms",
            "Fees & Payment",
            "<p>Fees are set out in the pricing schedule. Invoices are payable within 30 days. \
             All amounts are in Canadian dollars and HST is added where applicable. Late \
             balances accrue interest at 1.5% per month.</p>"
                .to_string(),
        )
        .required(),
        SectionTemplate::new("schedule", "Schedule", format!("<p>{}</p>", p.timeline)),
        SectionTemplate::new(
            "intellectual_property",
            "Intellectual Property",
            "<p>On payment in full, the Provider assigns to the Client all rights in the \
             deliverables created specifically for the Client. The Provider keeps its \
             pre-existing tools and libraries and grants the Client a perpetual licence to use \
             them as part of the deliverables.</p>"
                .to_string(),
        )
        .locked(),
        SectionTemplate::new(
            "confidentiality",
            "Confidentiality",
            "<p>Each party will keep the other's confidential information secret and use it only \
             to perform this agreement. This obligation survives termination for three \
             years.</p>"
                .to_string(),
        )
        .locked(),
        privacy_section(),
        SectionTemplate::new(
            "termination",
            "Termination",
            "<p>Either party may terminate this agreement with 30 days' written notice. The \
             Client will pay for work performed up to the termination date.</p>"
                .to_string(),
        )
        .locked(),
        SectionTemplate::new(
            "liability",
            "Limitation of Liability",
            "<p>Neither party is liable for indirect or consequential damages. The Provider's \
             total liability is limited to the fees paid under this agreement.</p>"
                .to_string(),
        )
        .locked(),
        SectionTemplate::new(
            "governing_law",
            "Governing Law",
            "<p>This agreement is governed by the laws of the Province of Ontario and the \
             federal laws of Canada applicable there.</p>"
                .to_string(),
        )
        .locked(),
    ];
    Template {
        document_type: DocumentType::Contract,
        service_type: p.service,
        title: format!("{} Agreement with {{{{CLIENT_NAME}}}}", p.headline),
        sections,
        pricing: line_items(p.pricing),
        compliance: compliance_items(
            &[
                PRIVACY,
                HST,
                (
                    "governing_law",
                    "Governing law",
                    "Ontario governing law and venue are stated.",
                ),
                (
                    "signing_authority",
                    "Signing authority",
                    "Each signer is authorized to bind their organization.",
                ),
            ],
            p,
        ),
    }
}

fn sla(p: &ServiceProfile, s: &SupportProfile) -> Template {
    let response_rows: Vec<String> = s
        .response
        .iter()
        .map(|(priority, target)| format!("{}: {}", priority, target))
        .collect();
    let response_refs: Vec<&str> = response_rows.iter().map(String::as_str).collect();

    let sections = vec![
        SectionTemplate::new(
            "service_description",
            "Service Description",
            format!(
                "<p>Starting {{{{DATE}}}}, CipherX Solutions provides {{{{CLIENT_NAME}}}} with {}.</p>",
                s.coverage
            ),
        )
        .required(),
        SectionTemplate::new(
            "availability",
            "Availability Target",
            format!(
                "<p>The Provider targets {} monthly availability, excluding scheduled maintenance \
                 announced at least 48 hours in advance.</p>",
                s.uptime
            ),
        )
        .required(),
        SectionTemplate::new(
            "response_times",
            "Response Times",
            bullet_list(&response_refs),
        )
        .required(),
        SectionTemplate::new(
            "support_hours",
            "Support Hours",
            "<p>Support is available Monday to Friday, 9:00 to 17:00 Eastern Time, excluding \
             Ontario statutory holidays. Critical issues may be reported at any time.</p>"
                .to_string(),
        ),
        SectionTemplate::new(
            "exclusions",
            "Exclusions",
            "<p>This agreement does not cover issues caused by third-party services, changes made \
             by the Client, or force majeure events.</p>"
                .to_string(),
        ),
        SectionTemplate::new(
            "service_credits",
            "Service Credits",
            "<p>If monthly availability falls below target, the Client receives a credit of 5% of \
             the monthly fee for each full 0.5% shortfall, up to 50% of that month's fee.</p>"
                .to_string(),
        )
        .locked(),
        privacy_section(),
        SectionTemplate::new(
            "term",
            "Term & Renewal",
            "<p>This agreement runs for twelve months and renews monthly afterwards until either \
             party gives 30 days' notice. The offer is open until {{EXPIRY_DATE}}.</p>"
                .to_string(),
        )
        .locked(),
    ];
    Template {
        document_type: DocumentType::Sla,
        service_type: p.service,
        title: format!("{} Service Level Agreement for {{{{CLIENT_NAME}}}}", p.headline),
        sections,
        pricing: line_items(s.pricing),
        compliance: compliance_items(
            &[
                PRIVACY,
                HST,
                (
                    "service_credits",
                    "Service credits",
                    "Remedies for missed availability targets are defined.",
                ),
            ],
            p,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn website_proposal_has_sections_and_pricing() {
        let t = TemplateCatalog::builtin()
            .lookup(DocumentType::Proposal, ServiceType::WebsiteOnly)
            .expect("template");
        assert!(!t.sections.is_empty());
        assert!(!t.pricing.is_empty());
        assert!(t.title.contains("{{CLIENT_NAME}}"));
    }

    #[test]
    fn graphic_design_sla_is_not_offered() {
        let catalog = TemplateCatalog::builtin();
        assert!(catalog
            .lookup(DocumentType::Sla, ServiceType::GraphicDesign)
            .is_none());
        assert_eq!(catalog.len(), 14);
    }

    #[test]
    fn section_keys_unique_within_each_template() {
        for (dt, st) in TemplateCatalog::builtin().combinations() {
            let t = TemplateCatalog::builtin().lookup(dt, st).unwrap();
            let keys: HashSet<_> = t.sections.iter().map(|s| s.key.as_str()).collect();
            assert_eq!(keys.len(), t.sections.len(), "{:?}/{:?}", dt, st);
            assert!(t.build_line_items().iter().all(|i| i.validate().is_ok()));
        }
    }

    #[test]
    fn locked_sections_are_required() {
        for (dt, st) in TemplateCatalog::builtin().combinations() {
            let t = TemplateCatalog::builtin().lookup(dt, st).unwrap();
            assert!(t.sections.iter().filter(|s| s.locked).all(|s| s.required));
        }
    }

    #[test]
    fn built_sections_are_densely_ordered() {
        let t = TemplateCatalog::builtin()
            .lookup(DocumentType::Contract, ServiceType::Cybersecurity)
            .unwrap();
        let orders: Vec<u32> = t.build_sections().iter().map(|s| s.sort_order).collect();
        assert_eq!(orders, (0..t.sections.len() as u32).collect::<Vec<_>>());
    }

    #[test]
    fn register_adds_new_combination() {
        let mut catalog = TemplateCatalog::builtin().clone();
        let template = Template {
            document_type: DocumentType::Sla,
            service_type: ServiceType::GraphicDesign,
            title: "Design Retainer".into(),
            sections: vec![SectionTemplate::new("retainer", "Retainer", "<p>Hours</p>".into())],
            pricing: vec![],
            compliance: vec![],
        };
        assert!(catalog.register(template).is_none());
        assert!(catalog
            .lookup(DocumentType::Sla, ServiceType::GraphicDesign)
            .is_some());
        assert_eq!(catalog.len(), 15);
    }
}

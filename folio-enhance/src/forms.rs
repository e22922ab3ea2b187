use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use folio_common::{FormSettings, NoticePolicy};
use folio_dom::{Document, DomError, ElementId, Event, EventKind, EventTarget, ListenerId, Selector};
use tracing::{debug, info, warn};

pub const INVALID_CLASS: &str = "is-invalid";
pub const NOTICE_CLASSES: &str = "alert alert-danger mt-3";

/// Outcome of checking one form's required fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub form: Option<ElementId>,
    /// Required fields holding something other than whitespace.
    pub filled: Vec<ElementId>,
    /// Required fields that are empty once trimmed.
    pub missing: Vec<ElementId>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Notices this guard inserted, per form.
type NoticeLedger = Arc<Mutex<HashMap<ElementId, Vec<ElementId>>>>;

/// Blocks submission of forms whose `[required]` fields are blank.
pub struct FormGuard {
    doc: Arc<dyn Document>,
    listeners: Vec<ListenerId>,
    notices: NoticeLedger,
}

impl FormGuard {
    /// Intercept submit on every form currently in the document.
    pub fn attach(doc: Arc<dyn Document>, settings: &FormSettings) -> Result<Self, DomError> {
        let forms = doc.query_selector_all(None, &Selector::parse("form")?);
        let notices: NoticeLedger = Arc::default();
        let listeners = forms
            .iter()
            .map(|&form| {
                let weak = Arc::downgrade(&doc);
                let notices = notices.clone();
                let message = settings.message.clone();
                let policy = settings.notice_policy;
                doc.add_event_listener(
                    EventTarget::Element(form),
                    EventKind::Submit,
                    Arc::new(move |ev: &mut Event| {
                        on_submit(&weak, form, ev, &message, policy, &notices);
                    }),
                )
            })
            .collect();
        debug!(target: "page.forms", forms = forms.len(), "form guard attached");
        Ok(Self {
            doc,
            listeners,
            notices,
        })
    }

    /// Check the required fields under `form` without touching the page.
    ///
    /// Elements marked `required` that carry no value (anything other than a
    /// form control) are not counted either way.
    pub fn validate(doc: &dyn Document, form: ElementId) -> Result<ValidationReport, DomError> {
        let required = Selector::parse("[required]")?;
        let mut report = ValidationReport {
            form: Some(form),
            ..ValidationReport::default()
        };
        for field in doc.query_selector_all(Some(form), &required) {
            match doc.value(field) {
                Some(v) if v.trim().is_empty() => report.missing.push(field),
                Some(_) => report.filled.push(field),
                None => debug!(target: "page.forms", %field, "required element has no value, ignored"),
            }
        }
        Ok(report)
    }

    pub fn guarded_forms(&self) -> usize {
        self.listeners.len()
    }

    /// Notices currently attached to `form` that this guard inserted.
    pub fn notices(&self, form: ElementId) -> Vec<ElementId> {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&form)
            .map(|list| {
                list.iter()
                    .copied()
                    .filter(|n| self.doc.is_connected(*n))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn dispose(self) {
        for id in self.listeners {
            self.doc.remove_event_listener(id);
        }
    }
}

fn on_submit(
    doc: &Weak<dyn Document>,
    form: ElementId,
    ev: &mut Event,
    message: &str,
    policy: NoticePolicy,
    notices: &NoticeLedger,
) {
    let Some(doc) = doc.upgrade() else {
        return;
    };
    let report = match FormGuard::validate(doc.as_ref(), form) {
        Ok(report) => report,
        Err(err) => {
            warn!(target: "page.forms", %form, error = %err, "validation skipped");
            return;
        }
    };
    if let Err(err) = mark_fields(doc.as_ref(), &report) {
        warn!(target: "page.forms", %form, error = %err, "could not mark fields");
    }
    if report.is_valid() {
        debug!(target: "page.forms", %form, fields = report.filled.len(), "form passed");
        return;
    }

    ev.prevent_default();
    info!(target: "page.forms", %form, missing = report.missing.len(), "submission blocked");
    if let Err(err) = insert_notice(doc.as_ref(), form, message, policy, notices) {
        warn!(target: "page.forms", %form, error = %err, "could not insert notice");
    }
}

fn mark_fields(doc: &dyn Document, report: &ValidationReport) -> Result<(), DomError> {
    for &field in &report.missing {
        doc.add_class(field, INVALID_CLASS)?;
    }
    for &field in &report.filled {
        doc.remove_class(field, INVALID_CLASS)?;
    }
    Ok(())
}

fn insert_notice(
    doc: &dyn Document,
    form: ElementId,
    message: &str,
    policy: NoticePolicy,
    notices: &NoticeLedger,
) -> Result<ElementId, DomError> {
    let mut ledger = notices.lock().unwrap_or_else(PoisonError::into_inner);
    let previous = ledger.entry(form).or_default();
    if policy == NoticePolicy::Replace {
        for old in previous.drain(..) {
            doc.remove_element(old)?;
        }
    }

    let notice = doc.create_element("div");
    doc.set_attribute(notice, "class", NOTICE_CLASSES)?;
    doc.set_text_content(notice, message)?;
    doc.prepend_child(form, notice)?;
    previous.push(notice);
    Ok(notice)
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_dom::MemoryDocument;

    struct Page {
        doc: Arc<MemoryDocument>,
        form: ElementId,
        title: ElementId,
        body: ElementId,
    }

    fn page() -> Page {
        let doc = Arc::new(MemoryDocument::new());
        let form = doc.append_element(doc.body(), "form", &[("method", "post")]).unwrap();
        let title = doc
            .append_element(form, "input", &[("name", "title"), ("required", "")])
            .unwrap();
        let body = doc
            .append_element(form, "textarea", &[("name", "body"), ("required", "")])
            .unwrap();
        doc.append_element(form, "input", &[("name", "tags")]).unwrap();
        Page {
            doc,
            form,
            title,
            body,
        }
    }

    fn guard(page: &Page, policy: NoticePolicy) -> FormGuard {
        let settings = FormSettings {
            notice_policy: policy,
            ..FormSettings::default()
        };
        FormGuard::attach(page.doc.clone(), &settings).unwrap()
    }

    #[test]
    fn blank_required_field_blocks_submission() {
        let p = page();
        let guard = guard(&p, NoticePolicy::Accumulate);
        p.doc.set_value(p.title, "Hello").unwrap();
        p.doc.set_value(p.body, "   \n\t").unwrap();

        let ev = p.doc.submit(p.form);

        assert!(ev.default_prevented());
        assert!(p.doc.submissions().is_empty());
        assert!(p.doc.has_class(p.body, INVALID_CLASS));
        assert!(!p.doc.has_class(p.title, INVALID_CLASS));

        let notices = guard.notices(p.form);
        assert_eq!(notices.len(), 1);
        assert_eq!(p.doc.children(p.form)[0], notices[0]);
        assert_eq!(p.doc.classes(notices[0]), vec!["alert", "alert-danger", "mt-3"]);
        assert_eq!(
            p.doc.text_content(notices[0]).as_deref(),
            Some("请填写所有必填字段")
        );
    }

    #[test]
    fn correcting_fields_clears_marks_and_submits() {
        let p = page();
        let _guard = guard(&p, NoticePolicy::Accumulate);

        assert!(p.doc.submit(p.form).default_prevented());
        assert!(p.doc.has_class(p.title, INVALID_CLASS));
        assert!(p.doc.has_class(p.body, INVALID_CLASS));

        p.doc.set_value(p.title, "Hello").unwrap();
        p.doc.set_value(p.body, "World").unwrap();
        let ev = p.doc.submit(p.form);

        assert!(!ev.default_prevented());
        assert!(!p.doc.has_class(p.title, INVALID_CLASS));
        assert!(!p.doc.has_class(p.body, INVALID_CLASS));
        assert_eq!(p.doc.submissions(), vec![p.form]);
    }

    #[test]
    fn repeated_failures_accumulate_notices_by_default() {
        let p = page();
        let guard = guard(&p, NoticePolicy::Accumulate);
        p.doc.submit(p.form);
        p.doc.submit(p.form);
        p.doc.submit(p.form);
        assert_eq!(guard.notices(p.form).len(), 3);
    }

    #[test]
    fn replace_policy_keeps_a_single_notice() {
        let p = page();
        let guard = guard(&p, NoticePolicy::Replace);
        p.doc.submit(p.form);
        p.doc.submit(p.form);
        let notices = guard.notices(p.form);
        assert_eq!(notices.len(), 1);
        assert_eq!(p.doc.children(p.form)[0], notices[0]);
        assert_eq!(p.doc.children(p.form).len(), 4);
    }

    #[test]
    fn form_without_required_fields_always_passes() {
        let doc = Arc::new(MemoryDocument::new());
        let form = doc.append_element(doc.body(), "form", &[]).unwrap();
        doc.append_element(form, "input", &[("name", "q")]).unwrap();
        let _guard = FormGuard::attach(doc.clone(), &FormSettings::default()).unwrap();

        assert!(!doc.submit(form).default_prevented());
        assert_eq!(doc.submissions(), vec![form]);
    }

    #[test]
    fn validate_is_side_effect_free() {
        let p = page();
        p.doc.set_value(p.title, " x ").unwrap();
        let report = FormGuard::validate(p.doc.as_ref(), p.form).unwrap();
        assert_eq!(report.filled, vec![p.title]);
        assert_eq!(report.missing, vec![p.body]);
        assert!(!report.is_valid());
        assert!(!p.doc.has_class(p.body, INVALID_CLASS));
    }

    #[test]
    fn non_control_required_elements_are_ignored() {
        let doc = Arc::new(MemoryDocument::new());
        let form = doc.append_element(doc.body(), "form", &[]).unwrap();
        doc.append_element(form, "div", &[("required", "")]).unwrap();
        let report = FormGuard::validate(doc.as_ref(), form).unwrap();
        assert!(report.is_valid());
        assert!(report.filled.is_empty());
    }

    #[test]
    fn dispose_lets_forms_submit_natively() {
        let p = page();
        let guard = guard(&p, NoticePolicy::Accumulate);
        assert_eq!(guard.guarded_forms(), 1);
        guard.dispose();
        assert!(!p.doc.submit(p.form).default_prevented());
    }
}

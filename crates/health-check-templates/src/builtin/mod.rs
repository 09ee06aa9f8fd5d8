//! Built-in templates shipped with the control plane, ported from
//! `check_backends/k8s_backend/template_examples/`.

pub mod ping;
pub mod script;

/// Returns every built-in template, ready to hand to
/// [`crate::registry::TemplateRegistry::new`].
pub fn builtin_templates() -> Vec<Box<dyn crate::registry::CronjobTemplate>> {
    vec![Box::new(ping::SimplePing), Box::new(script::DefaultK8sTemplate)]
}

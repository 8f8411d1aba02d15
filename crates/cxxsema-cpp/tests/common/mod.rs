use cxxsema_cpp::{Probe, TranslationUnit};
use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Analyze an indented source snippet.
pub fn analyze(source: &str) -> TranslationUnit {
    init_tracing();
    let source = textwrap::dedent(source);
    cxxsema_cpp::analyze(&source).expect("analysis should succeed")
}

#[allow(dead_code)]
pub fn probe<'u>(unit: &'u TranslationUnit, text: &str) -> &'u Probe {
    unit.probes
        .iter()
        .find(|probe| probe.text == text)
        .unwrap_or_else(|| {
            let known: Vec<_> = unit.probes.iter().map(|probe| probe.text.as_str()).collect();
            panic!("no probe '{text}', have {known:?}")
        })
}

/// Rendered type of the probe spelled `text`.
#[allow(dead_code)]
pub fn type_of(unit: &TranslationUnit, text: &str) -> String {
    let ty = unit.resolve(probe(unit, text));
    unit.render(&ty)
}

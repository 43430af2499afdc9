//! Section segmentation for debugger-session transcripts.
//!
//! [`segment`] is a pure function of the transcript text and a [`Catalog`]:
//! for every section type it collects the verbatim body of each occurrence,
//! in document order. Section types that never occur are absent from the
//! resulting [`Segmentation`].

pub mod catalog;
mod matcher;

use std::collections::BTreeMap;

use tracing::{debug, instrument};

use dbgsplit_shared::SectionId;

pub use catalog::{Catalog, builtin_rules};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// One extracted section instance.
///
/// `id` borrows from the [`Segmentation`]; `text` borrows from the transcript
/// and outlives the segmentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Section<'s, 'a> {
    pub id: &'s SectionId,
    /// 1-based position among the instances of `id`.
    pub index: usize,
    pub text: &'a str,
}

/// Section type → ordered captured bodies. Only types that matched are present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Segmentation<'a> {
    sections: BTreeMap<SectionId, Vec<&'a str>>,
}

impl<'a> Segmentation<'a> {
    /// Bodies captured for `id`, or `None` if the type never occurred.
    pub fn get(&self, id: &str) -> Option<&[&'a str]> {
        self.sections
            .get(&SectionId::from(id))
            .map(Vec::as_slice)
    }

    /// Section types that occurred, in identifier order.
    pub fn section_ids(&self) -> impl Iterator<Item = &SectionId> {
        self.sections.keys()
    }

    /// Every instance, grouped by type (identifier order), then by index.
    pub fn sections(&self) -> impl Iterator<Item = Section<'_, 'a>> {
        self.sections.iter().flat_map(|(id, bodies)| {
            bodies.iter().enumerate().map(move |(i, text)| Section {
                id,
                index: i + 1,
                text: *text,
            })
        })
    }

    /// Number of section types that occurred.
    pub fn type_count(&self) -> usize {
        self.sections.len()
    }

    /// Total number of instances across all types.
    pub fn instance_count(&self) -> usize {
        self.sections.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Segmenter
// ---------------------------------------------------------------------------

/// Split `text` into the sections described by `catalog`.
///
/// Every rule is applied independently to the whole text, so sections of
/// different types may overlap (a dash summary inside a memory banner body is
/// captured by both).
#[instrument(skip_all, fields(bytes = text.len(), rules = catalog.len()))]
pub fn segment<'a>(text: &'a str, catalog: &Catalog) -> Segmentation<'a> {
    let mut sections = BTreeMap::new();

    for compiled in catalog.compiled() {
        let bodies = compiled.matcher.find_all(text);
        if !bodies.is_empty() {
            sections.insert(compiled.rule.id.clone(), bodies);
        }
    }

    let segmentation = Segmentation { sections };
    debug!(
        types = segmentation.type_count(),
        instances = segmentation.instance_count(),
        "segmentation complete"
    );
    segmentation
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbgsplit_shared::{Family, SectionRule, Termination};

    const TRANSCRIPT: &str = "\
Microsoft (R) Windows Debugger Version 10.0.22621.2428 AMD64
************* Preparing the environment for Debugger Extensions Gallery repositories **************
   ExtensionRepository : Implicit
   UseExperimentalFeatureForNugetShare : true
************* Waiting for Debugger Extensions Gallery to Initialize **************
>>>>>>>>>>>>> Waiting for Debugger Extensions Gallery to Initialize completed, duration 0.031 seconds
ModLoad: 00007ff6`1a2b0000 00007ff6`1a2f3000   C:\\Windows\\System32\\notepad.exe
ModLoad: 00007ffa`6c8d0000 00007ffa`6cae7000   C:\\Windows\\SYSTEM32\\ntdll.dll
(1a2c.3f04): Break instruction exception - code 80000003 (first chance)
=== System Information ===
Windows 10 Version 22631 MP (8 procs) Free x64

=== Memory Information ===
--- Usage Summary ---------------- RgnCount ----------- Total Size -------- %ofBusy %ofTotal
Free                                     54     7df9`2b6a1000 ( 125.973 TB)           98.42%
<unknown>                               112        0`4f3c2000 (   1.238 GB)  60.12%    0.00%

--- Largest Region by Usage ----------- Base Address -------- Region Size ----------
Free                                    1f4`a3c40000     7d9b`1b8a0000 ( 125.606 TB)
=== Quitting ===
";

    #[test]
    fn scenario_system_and_memory_sections() {
        let text = "=== System Information ===\nCPU: x86\nCores: 4\n=== Memory Information ===\n...";
        let seg = segment(text, Catalog::builtin());
        assert_eq!(seg.get("system_info"), Some(&["CPU: x86\nCores: 4"][..]));
        assert_eq!(seg.get("memory_info"), Some(&["..."][..]));
        assert_eq!(seg.type_count(), 2);
    }

    #[test]
    fn scenario_modload_markers() {
        let text = "start\nModLoad: a.dll\nunrelated text\nModLoad: b.dll\nend\n";
        let seg = segment(text, Catalog::builtin());
        assert_eq!(seg.get("modload"), Some(&["ModLoad: a.dll", "ModLoad: b.dll"][..]));
    }

    #[test]
    fn absent_types_have_no_key() {
        let seg = segment("=== Stack Traces ===\nframe0\n", Catalog::builtin());
        assert!(seg.get("heap_summary").is_none());
        assert_eq!(seg.section_ids().count(), 1);
    }

    #[test]
    fn empty_input_yields_empty_segmentation() {
        let seg = segment("", Catalog::builtin());
        assert!(seg.is_empty());
        assert_eq!(seg.instance_count(), 0);
    }

    #[test]
    fn realistic_transcript() {
        let seg = segment(TRANSCRIPT, Catalog::builtin());

        assert_eq!(
            seg.get("preparing_env"),
            Some(
                &["   ExtensionRepository : Implicit\n   UseExperimentalFeatureForNugetShare : true"][..]
            )
        );
        // Unterminated by another asterisk banner: runs to end of input.
        let waiting = seg.get("waiting_for_debugger").expect("waiting section");
        assert!(waiting[0].starts_with(">>>>>>>>>>>>> Waiting"));
        assert!(waiting[0].ends_with("=== Quitting ==="));

        assert_eq!(seg.get("modload").map(<[_]>::len), Some(2));
        assert_eq!(
            seg.get("system_info"),
            Some(&["Windows 10 Version 22631 MP (8 procs) Free x64\n"][..])
        );

        let memory = seg.get("memory_info").expect("memory section");
        assert!(memory[0].starts_with("--- Usage Summary"));
        assert!(memory[0].ends_with("( 125.606 TB)"));

        let usage = seg.get("usage_summary").expect("usage summary");
        assert!(usage[0].starts_with("Free "));
        assert!(usage[0].ends_with("0.00%\n"));

        let largest = seg.get("largest_region").expect("largest region");
        assert!(largest[0].starts_with("Free"));
        assert!(largest[0].ends_with("=== Quitting ==="));
    }

    #[test]
    fn instances_are_indexed_in_document_order() {
        let text = "=== Thread Information ===\nt0\n=== Stack Traces ===\ns0\n=== Thread Information ===\nt1\n";
        let seg = segment(text, Catalog::builtin());
        let threads: Vec<_> = seg
            .sections()
            .filter(|s| s.id.as_str() == "thread_info")
            .map(|s| (s.index, s.text))
            .collect();
        assert_eq!(threads, vec![(1, "t0"), (2, "t1")]);
    }

    #[test]
    fn every_builtin_rule_yields_one_instance_at_index_one() {
        let body = "alpha 0x1f  00007ffa`6c8d0000\n\n    beta: gamma (delta)";
        let mut mismatches = Vec::new();

        for rule in Catalog::builtin().rules() {
            let literal = rule.delimiter.literal();
            let (header, closing, expected) = match rule.delimiter.family() {
                Family::Asterisk => (
                    format!("************* {literal} **************"),
                    Some("************* Done *************"),
                    body.to_string(),
                ),
                Family::Equals => (
                    format!("=== {literal} ==="),
                    Some("=== Done ==="),
                    body.to_string(),
                ),
                Family::Dash => (
                    format!("--- {literal} ---------- RgnCount ------- Total Size"),
                    Some("--- Done ---"),
                    body.to_string(),
                ),
                Family::Marker => {
                    let line = format!("{literal} 00007ff6`1a2b0000   C:\\Windows\\x.dll");
                    (line.clone(), None, line)
                }
            };

            let texts = match closing {
                Some(closing) => vec![
                    format!("{header}\n{body}\n"),
                    format!("{header}\n{body}\n{closing}\ntrailer\n"),
                ],
                None => vec![format!("{header}\n")],
            };

            for text in &texts {
                let seg = segment(text, Catalog::builtin());
                let got = seg.get(rule.id.as_str());
                if got != Some(&[expected.as_str()][..]) {
                    mismatches.push((rule.id.to_string(), text.clone(), format!("{got:?}")));
                }
                let indexes: Vec<_> = seg
                    .sections()
                    .filter(|s| s.id == &rule.id)
                    .map(|s| s.index)
                    .collect();
                if indexes != vec![1] {
                    mismatches.push((rule.id.to_string(), text.clone(), format!("{indexes:?}")));
                }
            }
        }

        assert!(mismatches.is_empty(), "mismatched rules: {mismatches:#?}");
        assert_eq!(Catalog::builtin().len(), 35);
    }

    #[test]
    fn segmentation_is_repeatable() {
        let first = segment(TRANSCRIPT, Catalog::builtin());
        let second = segment(TRANSCRIPT, Catalog::builtin());
        assert_eq!(first, second);
    }

    #[test]
    fn custom_catalog_with_any_banner_termination() {
        let catalog = Catalog::new(
            vec![SectionRule::equals("memory_info", "Memory Information")],
            Termination::AnyBanner,
        )
        .expect("catalog");
        let seg = segment(TRANSCRIPT, &catalog);
        assert_eq!(seg.get("memory_info"), Some(&[""][..]));
    }
}

//! The section catalog: every known section type bound to its delimiter rule.
//!
//! A [`Catalog`] is validated and compiled once, then shared read-only by
//! every segmentation call.

use std::collections::HashSet;
use std::sync::LazyLock;

use tracing::debug;

use dbgsplit_shared::{Result, SectionId, SectionRule, SplitError, Termination};

use crate::matcher::Matcher;

/// Built-in rules, in the order the capture script emits them.
pub fn builtin_rules() -> Vec<SectionRule> {
    vec![
        SectionRule::asterisk(
            "preparing_env",
            "Preparing the environment for Debugger Extensions Gallery repositories",
        ),
        SectionRule::asterisk(
            "waiting_for_debugger",
            "Waiting for Debugger Extensions Gallery to Initialize",
        ),
        SectionRule::asterisk("path_validation_summary", "Path validation summary"),
        SectionRule::marker("modload", "ModLoad:"),
        SectionRule::equals("processor_info", "Processor Information"),
        SectionRule::equals("system_info", "System Information"),
        SectionRule::equals("register_states", "Register States"),
        SectionRule::equals("disassemble_code_32", "Disassemble Code (EIP) for 32-bit"),
        SectionRule::equals("disassemble_code_64", "Disassemble Code (RIP) for 64-bit"),
        SectionRule::equals("memory_info", "Memory Information"),
        SectionRule::dash("usage_summary", "Usage Summary"),
        SectionRule::dash("type_summary", "Type Summary (for busy)"),
        SectionRule::dash("state_summary", "State Summary"),
        SectionRule::dash("protect_summary", "Protect Summary (for commit)"),
        SectionRule::dash("largest_region", "Largest Region by Usage"),
        SectionRule::equals("virtual_memory_layout", "Virtual Memory Layout"),
        SectionRule::equals("loaded_modules", "Loaded Modules"),
        SectionRule::equals("dump_memory_contents_32", "Dump Memory Contents (EIP) for 32-bit"),
        SectionRule::equals("dump_memory_contents_64", "Dump Memory Contents (RIP) for 64-bit"),
        SectionRule::equals("list_threads", "List Threads"),
        SectionRule::equals("thread_info", "Thread Information"),
        SectionRule::equals("stack_traces", "Stack Traces"),
        SectionRule::equals("heap_summary", "Heap Summary"),
        SectionRule::equals("kernel_structures", "Kernel Structures"),
        SectionRule::equals("kernel_memory_info", "Kernel Memory Information"),
        SectionRule::equals("kernel_debugging_structures", "Kernel Debugging Structures"),
        SectionRule::equals("loaded_drivers", "Loaded Drivers"),
        SectionRule::equals("loaded_images", "Loaded Images"),
        SectionRule::equals("paged_pools", "Loaded Paged Pools"),
        SectionRule::equals("kernel_modules", "Kernel Modules"),
        SectionRule::equals("object_info", "Object Information"),
        SectionRule::equals("handle_table", "Handle Table"),
        SectionRule::equals("page_table_entries", "Page Table Entries"),
        SectionRule::equals("dump_driver_object", "Dump Driver Object"),
        SectionRule::equals("memory_info_full", "Memory Information (Full)"),
    ]
}

static BUILTIN: LazyLock<Catalog> = LazyLock::new(|| {
    Catalog::new(builtin_rules(), Termination::FamilyScoped).expect("built-in catalog is valid")
});

/// A rule together with its compiled matcher.
#[derive(Debug, Clone)]
pub(crate) struct CompiledRule {
    pub(crate) rule: SectionRule,
    pub(crate) matcher: Matcher,
}

/// Immutable, validated set of section rules.
#[derive(Debug, Clone)]
pub struct Catalog {
    rules: Vec<CompiledRule>,
    termination: Termination,
}

impl Catalog {
    /// Validate and compile `rules`.
    ///
    /// Fails on invalid or duplicate identifiers and on empty titles/prefixes.
    pub fn new(rules: Vec<SectionRule>, termination: Termination) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut compiled = Vec::with_capacity(rules.len());

        for rule in rules {
            if !rule.id.is_valid() {
                return Err(SplitError::catalog(format!(
                    "invalid section id '{}': expected lowercase letters, digits and '_'",
                    rule.id
                )));
            }
            if !seen.insert(rule.id.clone()) {
                return Err(SplitError::catalog(format!("duplicate section id '{}'", rule.id)));
            }
            if rule.delimiter.literal().trim().is_empty() {
                return Err(SplitError::catalog(format!(
                    "section '{}' has an empty {} delimiter",
                    rule.id,
                    rule.delimiter.family()
                )));
            }

            let matcher = Matcher::compile(&rule.delimiter, termination)?;
            compiled.push(CompiledRule { rule, matcher });
        }

        debug!(rules = compiled.len(), %termination, "catalog compiled");

        Ok(Self {
            rules: compiled,
            termination,
        })
    }

    /// The built-in catalog with family-scoped termination.
    pub fn builtin() -> &'static Catalog {
        &BUILTIN
    }

    /// Built-in rules followed by `extra`, compiled under `termination`.
    pub fn with_extra(extra: &[SectionRule], termination: Termination) -> Result<Self> {
        let mut rules = builtin_rules();
        rules.extend(extra.iter().cloned());
        Self::new(rules, termination)
    }

    pub fn rules(&self) -> impl Iterator<Item = &SectionRule> {
        self.rules.iter().map(|c| &c.rule)
    }

    pub fn get(&self, id: &str) -> Option<&SectionRule> {
        self.rules().find(|r| r.id.as_str() == id)
    }

    pub fn contains(&self, id: &SectionId) -> bool {
        self.rules.iter().any(|c| &c.rule.id == id)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn termination(&self) -> Termination {
        self.termination
    }

    pub(crate) fn compiled(&self) -> &[CompiledRule] {
        &self.rules
    }
}

//! Branch prediction statistics collection and reporting.
//!
//! Counters are incremented by the orchestrator as a pure side channel; no counter is
//! ever read back to make a prediction decision. It tracks:
//! 1. **Direction:** Lookups, conditional predictions, and conditional corrections.
//! 2. **Targets:** BTB lookups, hits, and updates; RAS use and corrections.
//! 3. **Indirect:** Indirect predictor lookups, hits, misses, and mispredictions.
//! 4. **History:** Entries retired and squashed.

use serde::Serialize;

/// Prediction unit statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BpStats {
    /// Number of predictions made.
    pub lookups: u64,
    /// Number of conditional branches predicted.
    pub cond_predicted: u64,
    /// Number of mispredictions reported to recovery.
    pub cond_incorrect: u64,
    /// Number of BTB lookups.
    pub btb_lookups: u64,
    /// Number of BTB updates.
    pub btb_updates: u64,
    /// Number of BTB hits.
    pub btb_hits: u64,
    /// Number of times the RAS was consulted for a target.
    pub ras_used: u64,
    /// Number of corrected predictions that had modified the RAS.
    pub ras_incorrect: u64,
    /// Number of indirect predictor lookups.
    pub indirect_lookups: u64,
    /// Number of indirect target hits.
    pub indirect_hits: u64,
    /// Number of indirect target misses.
    pub indirect_misses: u64,
    /// Number of mispredicted indirect-resolved branches.
    pub indirect_mispredicted: u64,
    /// Number of history entries retired.
    pub committed: u64,
    /// Number of history entries discarded by squash.
    pub squashed: u64,
}

/// Section names for selective stats output.
///
/// Valid section identifiers: `"direction"`, `"btb"`, `"ras"`, `"indirect"`, `"history"`.
pub const STATS_SECTIONS: &[&str] = &["direction", "btb", "ras", "indirect", "history"];

impl BpStats {
    /// Fraction of BTB lookups that hit, or 0.0 with no lookups.
    pub fn btb_hit_ratio(&self) -> f64 {
        if self.btb_lookups == 0 {
            0.0
        } else {
            self.btb_hits as f64 / self.btb_lookups as f64
        }
    }

    /// Fraction of predictions not subsequently corrected, or 0.0 with no lookups.
    pub fn accuracy(&self) -> f64 {
        if self.lookups == 0 {
            0.0
        } else {
            self.lookups.saturating_sub(self.cond_incorrect) as f64 / self.lookups as f64
        }
    }

    /// Renders the requested sections; an empty slice renders all of them.
    pub fn render_sections(&self, sections: &[String]) -> String {
        let want = |s: &str| sections.is_empty() || sections.iter().any(|x| x == s);
        let mut out = String::new();
        let mut line = |s: String| {
            out.push_str(&s);
            out.push('\n');
        };

        line("==========================================================".to_owned());
        line("BRANCH PREDICTION STATISTICS".to_owned());
        line("==========================================================".to_owned());
        if want("direction") {
            line(format!("  bp.lookups             {}", self.lookups));
            line(format!("  bp.cond_predicted      {}", self.cond_predicted));
            line(format!("  bp.cond_incorrect      {}", self.cond_incorrect));
            line(format!("  bp.accuracy            {:.2}%", self.accuracy() * 100.0));
        }
        if want("btb") {
            line(format!("  btb.lookups            {}", self.btb_lookups));
            line(format!("  btb.hits               {}", self.btb_hits));
            line(format!("  btb.updates            {}", self.btb_updates));
            line(format!("  btb.hit_ratio          {:.6}", self.btb_hit_ratio()));
        }
        if want("ras") {
            line(format!("  ras.used               {}", self.ras_used));
            line(format!("  ras.incorrect          {}", self.ras_incorrect));
        }
        if want("indirect") {
            line(format!("  indirect.lookups       {}", self.indirect_lookups));
            line(format!("  indirect.hits          {}", self.indirect_hits));
            line(format!("  indirect.misses        {}", self.indirect_misses));
            line(format!("  indirect.mispredicted  {}", self.indirect_mispredicted));
        }
        if want("history") {
            line(format!("  hist.committed         {}", self.committed));
            line(format!("  hist.squashed          {}", self.squashed));
        }
        line("==========================================================".to_owned());
        out
    }

    /// Prints only the requested statistics sections to stdout.
    ///
    /// # Arguments
    ///
    /// * `sections` - Slice of section names to print, or empty for all.
    pub fn print_sections(&self, sections: &[String]) {
        print!("{}", self.render_sections(sections));
    }

    /// Prints all statistics sections to stdout.
    pub fn print(&self) {
        self.print_sections(&[]);
    }
}

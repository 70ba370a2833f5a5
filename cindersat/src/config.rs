//! Solver configuration.
use serde::Deserialize;

/// Branching heuristic used to pick decision variables.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BranchingMode {
    Vsids,
    Lrb,
}

impl Default for BranchingMode {
    fn default() -> BranchingMode {
        if cfg!(feature = "lrb") {
            BranchingMode::Lrb
        } else {
            BranchingMode::Vsids
        }
    }
}

/// Restart policy of the search.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RestartMode {
    Luby,
    Glucose,
}

impl Default for RestartMode {
    fn default() -> RestartMode {
        RestartMode::Glucose
    }
}

/// Configurable parameters used during solving.
pub struct SolverConfig {
    /// Branching heuristic. (Default: vsids, or lrb with the `lrb` feature)
    pub branching: BranchingMode,

    /// Multiplicative decay for the VSIDS decision heuristic. (Default: 0.95)
    pub vsids_decay: f64,

    /// Multiplicative decay for clause activities. (Default: 0.999)
    pub clause_activity_decay: f32,

    /// Restart policy. (Default: glucose)
    pub restarts: RestartMode,

    /// Scaling factor for luby sequence based restarts (number of conflicts). (Default: 128)
    pub luby_restart_interval_scale: u64,

    /// Forces a restart when the short LBD average exceeds the long average divided by this
    /// factor. (Default: 0.8)
    pub restart_lbd_ratio: f64,

    /// Blocks a pending restart when the trail grows beyond this factor times its long term
    /// average. (Default: 1.4)
    pub restart_blocking_scale: f64,

    /// Number of conflicts before the first clause database reduction. (Default: 2000)
    pub reduce_interval_first: u64,

    /// Increment of the reduction interval per performed reduction. (Default: 300)
    pub reduce_interval_inc: u64,

    /// Learned clauses with an LBD up to this value are never deleted. (Default: 2)
    pub reduce_glue_keep: usize,

    /// Number of conflicts between inprocessing runs, zero disables inprocessing.
    /// (Default: 10000)
    pub inprocess_interval: u64,

    /// Clauses longer than this are not used for subsumption checks. (Default: 30)
    pub subsume_clause_size_limit: usize,

    /// Variables are only eliminated when the product of their occurrence counts is below this
    /// limit. (Default: 10000)
    pub elim_occ_product_limit: usize,

    /// Variables are not eliminated when this would produce a resolvent with more literals.
    /// (Default: 20)
    pub elim_clause_len_limit: usize,

    /// Number of extra clauses variable elimination may introduce. (Default: 0)
    pub elim_grow_limit: usize,

    /// Learned clauses with an LBD up to this value are exported to a shared clause pool.
    /// (Default: 3)
    pub share_glue_limit: usize,
}

impl Default for SolverConfig {
    fn default() -> SolverConfig {
        SolverConfig {
            branching: BranchingMode::default(),
            vsids_decay: 0.95,
            clause_activity_decay: 0.999,
            restarts: RestartMode::default(),
            luby_restart_interval_scale: 128,
            restart_lbd_ratio: 0.8,
            restart_blocking_scale: 1.4,
            reduce_interval_first: 2000,
            reduce_interval_inc: 300,
            reduce_glue_keep: 2,
            inprocess_interval: 10000,
            subsume_clause_size_limit: 30,
            elim_occ_product_limit: 10000,
            elim_clause_len_limit: 20,
            elim_grow_limit: 0,
            share_glue_limit: 3,
        }
    }
}

impl SolverConfig {
    /// Overview of all configurable parameters.
    pub fn help() -> &'static str {
        concat!(
            "branching = vsids|lrb          branching heuristic\n",
            "vsids_decay = 0.95             multiplicative decay of VSIDS activities\n",
            "clause_activity_decay = 0.999  multiplicative decay of clause activities\n",
            "restarts = luby|glucose        restart policy\n",
            "luby_restart_interval_scale = 128\n",
            "restart_lbd_ratio = 0.8        dynamic restart forcing threshold\n",
            "restart_blocking_scale = 1.4   dynamic restart blocking threshold\n",
            "reduce_interval_first = 2000   conflicts before the first reduction\n",
            "reduce_interval_inc = 300      reduction interval increment\n",
            "reduce_glue_keep = 2           LBD limit below which clauses are kept\n",
            "inprocess_interval = 10000     conflicts between inprocessing runs (0 = off)\n",
            "subsume_clause_size_limit = 30 maximal subsuming clause size\n",
            "elim_occ_product_limit = 10000 occurrence bound for variable elimination\n",
            "elim_clause_len_limit = 20     maximal resolvent length\n",
            "elim_grow_limit = 0            allowed clause count growth per elimination\n",
            "share_glue_limit = 3           LBD limit for exported clauses\n",
        )
    }
}

/// Partial update of a [`SolverConfig`].
///
/// Fields that are not present keep their current value.
#[derive(Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SolverConfigUpdate {
    pub branching: Option<BranchingMode>,
    pub vsids_decay: Option<f64>,
    pub clause_activity_decay: Option<f32>,
    pub restarts: Option<RestartMode>,
    pub luby_restart_interval_scale: Option<u64>,
    pub restart_lbd_ratio: Option<f64>,
    pub restart_blocking_scale: Option<f64>,
    pub reduce_interval_first: Option<u64>,
    pub reduce_interval_inc: Option<u64>,
    pub reduce_glue_keep: Option<usize>,
    pub inprocess_interval: Option<u64>,
    pub subsume_clause_size_limit: Option<usize>,
    pub elim_occ_product_limit: Option<usize>,
    pub elim_clause_len_limit: Option<usize>,
    pub elim_grow_limit: Option<usize>,
    pub share_glue_limit: Option<usize>,
}

macro_rules! merge_fields {
    ($from:expr, $into:expr, $( $field:ident ),* $(,)?) => {
        $(
            if let Some(value) = $from.$field {
                $into.$field = value;
            }
        )*
    };
}

impl SolverConfigUpdate {
    pub fn new() -> SolverConfigUpdate {
        SolverConfigUpdate::default()
    }

    /// Merge a later update into this one.
    pub fn merge(&mut self, other: SolverConfigUpdate) {
        merge_fields_option(self, other);
    }

    /// Apply the update to a configuration.
    pub fn apply(&self, config: &mut SolverConfig) {
        merge_fields!(
            self,
            config,
            branching,
            vsids_decay,
            clause_activity_decay,
            restarts,
            luby_restart_interval_scale,
            restart_lbd_ratio,
            restart_blocking_scale,
            reduce_interval_first,
            reduce_interval_inc,
            reduce_glue_keep,
            inprocess_interval,
            subsume_clause_size_limit,
            elim_occ_product_limit,
            elim_clause_len_limit,
            elim_grow_limit,
            share_glue_limit,
        );
    }
}

fn merge_fields_option(into: &mut SolverConfigUpdate, from: SolverConfigUpdate) {
    macro_rules! merge_options {
        ($( $field:ident ),* $(,)?) => {
            $(
                if from.$field.is_some() {
                    into.$field = from.$field;
                }
            )*
        };
    }
    merge_options!(
        branching,
        vsids_decay,
        clause_activity_decay,
        restarts,
        luby_restart_interval_scale,
        restart_lbd_ratio,
        restart_blocking_scale,
        reduce_interval_first,
        reduce_interval_inc,
        reduce_glue_keep,
        inprocess_interval,
        subsume_clause_size_limit,
        elim_occ_product_limit,
        elim_clause_len_limit,
        elim_grow_limit,
        share_glue_limit,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_merge_and_apply() {
        let mut config = SolverConfig::default();

        let mut update = SolverConfigUpdate::new();
        update.merge(SolverConfigUpdate {
            vsids_decay: Some(0.9),
            ..SolverConfigUpdate::default()
        });
        update.merge(SolverConfigUpdate {
            restarts: Some(RestartMode::Luby),
            ..SolverConfigUpdate::default()
        });

        update.apply(&mut config);

        assert_eq!(config.vsids_decay, 0.9);
        assert_eq!(config.restarts, RestartMode::Luby);
        assert_eq!(config.reduce_glue_keep, 2);
    }
}

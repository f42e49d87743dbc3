use crate::core::bins::BinBoundaries;

pub struct WestCfgContext<'a> {
    pub pcoord_ndim: usize,
    pub pcoord_len: u64,
    /// One boundary list per CV, in CV order.
    pub boundaries: &'a [BinBoundaries],
    pub bin_target_counts: u32,
    pub max_total_iterations: u64,
}

pub fn render(ctx: &WestCfgContext) -> String {
    let boundaries: String = ctx
        .boundaries
        .iter()
        .map(|b| format!("          - {}\n", b.to_flow_list()))
        .collect();

    let mut out = format!(
        r#"# The master WEST configuration file for a simulation.
# vi: set filetype=yaml :
---
west:
  system:
    driver: westpa.core.systems.WESTSystem
    system_options:
      # Dimensionality of your progress coordinate
      pcoord_ndim: {ndim}
      # Number of data points per iteration
      # Needs to be pcoord_len >= 2 (minimum of parent, last frame) to work with most analysis tools
      pcoord_len: {len}
      # Data type for your progress coordinate
      pcoord_dtype: !!python/name:numpy.float32
      bins:
        type: RectilinearBinMapper
        # The edges of the bins
        boundaries:
{boundaries}      # Number walkers per bin
      bin_target_counts: {counts}
  propagation:
    max_total_iterations: {iterations}
    max_run_wallclock:    47:30:00
    propagator:           executable
    gen_istates:          false
"#,
        ndim = ctx.pcoord_ndim,
        len = ctx.pcoord_len,
        boundaries = boundaries,
        counts = ctx.bin_target_counts,
        iterations = ctx.max_total_iterations,
    );
    out.push_str(DATA_AND_EXECUTABLE);
    out
}

const DATA_AND_EXECUTABLE: &str = r#"  data:
    west_data_file: west.h5
    datasets:
      - name:        pcoord
        scaleoffset: 4
      - name:        coord
        dtype:       float32
        scaleoffset: 3
    data_refs:
      segment:       $WEST_SIM_ROOT/traj_segs/{segment.n_iter:06d}/{segment.seg_id:06d}
      basis_state:   $WEST_SIM_ROOT/bstates/{basis_state.auxref}
      initial_state: $WEST_SIM_ROOT/istates/{initial_state.iter_created}/{initial_state.state_id}.rst
  plugins:
  executable:
    environ:
      PROPAGATION_DEBUG: 1
    datasets:
      - name:    coord
        enabled: false
    propagator:
      executable: $WEST_SIM_ROOT/westpa_scripts/runseg.sh
      stdout:     $WEST_SIM_ROOT/seg_logs/{segment.n_iter:06d}/{segment.seg_id:06d}.log
      stderr:     stdout
      stdin:      null
      cwd:        null
      environ:
        SEG_DEBUG: 1
    get_pcoord:
      executable: $WEST_SIM_ROOT/westpa_scripts/get_pcoord.sh
      stdout:     /dev/null
      stderr:     stdout
    gen_istate:
      executable: $WEST_SIM_ROOT/westpa_scripts/gen_istate.sh
      stdout:     /dev/null
      stderr:     stdout
    post_iteration:
      enabled:    true
      executable: $WEST_SIM_ROOT/westpa_scripts/post_iter.sh
      stderr:     stdout
    pre_iteration:
      enabled:    false
      executable: $WEST_SIM_ROOT/westpa_scripts/pre_iter.sh
      stderr:     stdout
"#;

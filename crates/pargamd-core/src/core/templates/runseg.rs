use super::AnalysisContext;

pub struct RunsegContext<'a> {
    pub analysis: AnalysisContext<'a>,
    /// Pin each worker to one of the allocated GPUs by its process index.
    pub enable_gpu_parallelization: bool,
}

/// Renders `westpa_scripts/runseg.sh`, the per-segment propagation script.
///
/// The segment trajectory includes the parent frame, so the first line of each
/// CV output is skipped when extracting the progress coordinate.
pub fn render(ctx: &RunsegContext) -> String {
    let protein = ctx.analysis.protein_name;
    let gpu_block = if ctx.enable_gpu_parallelization {
        GPU_DEVICE_ASSIGNMENT
    } else {
        ""
    };

    format!(
        r#"#!/bin/bash

if [ -n "$SEG_DEBUG" ] ; then
  set -x
  env | sort
fi

cd $WEST_SIM_ROOT
mkdir -pv $WEST_CURRENT_SEG_DATA_REF
cd $WEST_CURRENT_SEG_DATA_REF

ln -sv $WEST_SIM_ROOT/common_files/{protein}.prmtop .
ln -sv $WEST_SIM_ROOT/common_files/gamd-restart.dat .

if [ "$WEST_CURRENT_SEG_INITPOINT_TYPE" = "SEG_INITPOINT_CONTINUES" ]; then
  sed "s/RAND/$WEST_RAND16/g" $WEST_SIM_ROOT/common_files/md.in > md.in
  ln -sv $WEST_PARENT_DATA_REF/seg.rst ./parent.rst
elif [ "$WEST_CURRENT_SEG_INITPOINT_TYPE" = "SEG_INITPOINT_NEWTRAJ" ]; then
  sed "s/RAND/$WEST_RAND16/g" $WEST_SIM_ROOT/common_files/md_init.in > md.in
  ln -sv $WEST_PARENT_DATA_REF ./parent.rst
fi
{gpu_block}
while ! grep -q "Final Performance Info" seg.log; do
	$PMEMD -O -i md.in   -p {protein}.prmtop  -c parent.rst \
          -r seg.rst -x seg.nc      -o seg.log    -inf seg.nfo -gamd gamd.log
done

# Progress Coordinate Calculation
COMMAND="         parm {protein}.prmtop\n"
COMMAND="${{COMMAND}} trajin $WEST_CURRENT_SEG_DATA_REF/parent.rst\n"
COMMAND="${{COMMAND}} trajin $WEST_CURRENT_SEG_DATA_REF/seg.nc\n"
COMMAND="${{COMMAND}} reference {reference}\n"
{commands}
COMMAND="${{COMMAND}} go\n"

echo -e $COMMAND | $CPPTRAJ

# Extract progress coordinate values
{extraction}

# Clean up
rm -f md.in seg.nfo seg.pdb
"#,
        protein = protein,
        gpu_block = gpu_block,
        reference = ctx.analysis.reference_file(),
        commands = ctx.analysis.commands(),
        extraction = ctx.analysis.extraction("-n +2"),
    )
}

const GPU_DEVICE_ASSIGNMENT: &str = r#"
export CUDA_DEVICES=(`echo $CUDA_VISIBLE_DEVICES_ALLOCATED | tr , ' '`)
export CUDA_VISIBLE_DEVICES=${CUDA_DEVICES[$WM_PROCESS_INDEX]}

echo "RUNSEG.SH: CUDA_VISIBLE_DEVICES_ALLOCATED = " $CUDA_VISIBLE_DEVICES_ALLOCATED
echo "RUNSEG.SH: WM_PROCESS_INDEX = " $WM_PROCESS_INDEX
echo "RUNSEG.SH: CUDA_VISIBLE_DEVICES = " $CUDA_VISIBLE_DEVICES
"#;

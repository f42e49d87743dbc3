use super::AnalysisContext;

/// Renders `westpa_scripts/get_pcoord.sh`, which computes the progress
/// coordinate of a single basis or initial state structure.
///
/// Only the last line of each CV output is used, since the input holds one frame.
pub fn render(ctx: &AnalysisContext) -> String {
    format!(
        r#"#!/bin/bash

if [ -n "$SEG_DEBUG" ] ; then
  set -x
  env | sort
fi

cd $WEST_SIM_ROOT

COMMAND="parm $WEST_SIM_ROOT/common_files/{protein}.prmtop \n"
COMMAND="${{COMMAND}} trajin $WEST_STRUCT_DATA_REF \n"
COMMAND="${{COMMAND}} reference {reference} \n"
{commands}
COMMAND="${{COMMAND}} go"

echo -e "${{COMMAND}}" | $CPPTRAJ

# Extract progress coordinate values
{extraction}

if [ -n "$SEG_DEBUG" ] ; then
  head -v $WEST_PCOORD_RETURN
fi
"#,
        protein = ctx.protein_name,
        reference = ctx.reference_file(),
        commands = ctx.commands(),
        extraction = ctx.extraction("-n 1"),
    )
}

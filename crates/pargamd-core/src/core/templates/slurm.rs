//! SLURM submission scripts for the conventional-MD stage and the WE run.

use crate::engine::config::SchedulerOptions;

pub struct JobContext<'a> {
    pub protein_name: &'a str,
    pub account: &'a str,
    pub email: &'a str,
    pub scheduler: &'a SchedulerOptions,
}

impl JobContext<'_> {
    fn header(&self, job_name: &str) -> String {
        let s = self.scheduler;
        format!(
            r#"#!/bin/bash
#SBATCH --job-name="{job_name}"
#SBATCH --output="job.out"
#SBATCH --partition={partition}
#SBATCH --nodes={nodes}
#SBATCH --gpus={gpus}
#SBATCH --ntasks-per-node={ntasks}
#SBATCH --mem={memory}
#SBATCH --account={account}
#SBATCH --no-requeue
#SBATCH --mail-user={email}
#SBATCH --mail-type=ALL
#SBATCH -t {wall_time}
"#,
            job_name = job_name,
            partition = s.partition,
            nodes = s.nodes,
            gpus = s.gpus,
            ntasks = s.ntasks_per_node,
            memory = s.memory,
            account = self.account,
            email = self.email,
            wall_time = s.wall_time,
        )
    }
}

/// Renders `cMD/run_cmd.sh`, the GaMD equilibration job.
pub fn render_run_cmd(ctx: &JobContext) -> String {
    let p = ctx.protein_name;
    let mut out = ctx.header(&format!("{}_GaMD", p));
    out.push_str(
        r#"
module purge
module load shared
module load gpu/0.15.4
module load slurm
module load openmpi/4.0.4
module load cuda/11.0.2
module load amber/20

export PATH=$PATH:$HOME/bin
export LD_LIBRARY_PATH=$LD_LIBRARY_PATH
source $AMBERHOME/amber.sh
"#,
    );
    out.push_str(&format!(
        "pmemd.cuda -O -i md.in -o md.out -p {p}.prmtop -c {p}.rst -r md_cmd.rst -x md.nc\n",
        p = p
    ));
    out
}

/// Renders `run_WE.sh`, which starts the ZMQ master and one client per node.
pub fn render_run_we(ctx: &JobContext) -> String {
    let mut out = ctx.header(&format!("{}_WE_run", ctx.protein_name));
    out.push_str(RUN_WE_SETUP);
    out.push_str(&format!("num_gpu_per_node={}\n", ctx.scheduler.gpus));
    out.push_str(RUN_WE_LAUNCH);
    out
}

const RUN_WE_SETUP: &str = r#"
set -x
cd $SLURM_SUBMIT_DIR
source ~/.bashrc
module purge
module load shared
module load gpu/0.15.4
module load slurm
module load openmpi/4.0.4
module load cuda/11.0.2
module load amber/20-patch15
conda activate westpa-2.0

export LD_LIBRARY_PATH=$LD_LIBRARY_PATH
export WEST_SIM_ROOT=$SLURM_SUBMIT_DIR
cd $WEST_SIM_ROOT
export PYTHONPATH=$HOME/miniconda3/envs/westpa-2.0/bin/python

./init.sh
echo "init.sh ran"
source env.sh || exit 1
env | sort
SERVER_INFO=$WEST_SIM_ROOT/west_zmq_info.json

"#;

const RUN_WE_LAUNCH: &str = r#"rm -rf nodefilelist.txt
scontrol show hostname $SLURM_JOB_NODELIST > nodefilelist.txt

# start server
w_run --work-manager=zmq --n-workers=0 --zmq-mode=master --zmq-write-host-info=$SERVER_INFO --zmq-comm-mode=tcp &> west-$SLURM_JOBID-local.log &

# wait on host info file up to 1 min
for ((n=0; n<60; n++)); do
    if [ -e $SERVER_INFO ] ; then
        echo "== server info file $SERVER_INFO =="
        cat $SERVER_INFO
        break
    fi
    sleep 1
done

# exit if host info file doesn't appear in one minute
if ! [ -e $SERVER_INFO ] ; then
    echo 'server failed to start'
    exit 1
fi
export CUDA_VISIBLE_DEVICES=0
echo $CUDA_VISIBLE_DEVICES
for node in $(cat nodefilelist.txt); do
    ssh -o StrictHostKeyChecking=no $node $PWD/node.sh $SLURM_SUBMIT_DIR $SLURM_JOBID $node $CUDA_VISIBLE_DEVICES --work-manager=zmq --n-workers=$num_gpu_per_node --zmq-mode=client --zmq-read-host-info=$SERVER_INFO --zmq-comm-mode=tcp &
done
wait
"#;

#[cfg(test)]
mod tests {
    use super::*;

    fn context(scheduler: &SchedulerOptions) -> JobContext<'_> {
        JobContext {
            protein_name: "chignolin",
            account: "abc123",
            email: "me@example.org",
            scheduler,
        }
    }

    #[test]
    fn run_cmd_names_the_gamd_job_and_runs_pmemd() {
        let scheduler = SchedulerOptions::default();
        let script = render_run_cmd(&context(&scheduler));
        assert!(script.starts_with("#!/bin/bash\n#SBATCH --job-name=\"chignolin_GaMD\"\n"));
        assert!(script.contains("#SBATCH --account=abc123\n"));
        assert!(script.contains("#SBATCH --mail-user=me@example.org\n"));
        assert!(script.contains("#SBATCH --partition=gpu-shared\n"));
        assert!(script.contains("#SBATCH -t 48:00:00\n"));
        assert!(script.ends_with(
            "pmemd.cuda -O -i md.in -o md.out -p chignolin.prmtop -c chignolin.rst -r md_cmd.rst -x md.nc\n"
        ));
    }

    #[test]
    fn run_we_uses_scheduler_resources() {
        let scheduler = SchedulerOptions {
            partition: "gpu".to_string(),
            nodes: 2,
            gpus: 4,
            memory: "96G".to_string(),
            ..SchedulerOptions::default()
        };
        let script = render_run_we(&context(&scheduler));
        assert!(script.contains("#SBATCH --job-name=\"chignolin_WE_run\"\n"));
        assert!(script.contains("#SBATCH --nodes=2\n#SBATCH --gpus=4\n"));
        assert!(script.contains("#SBATCH --mem=96G\n"));
        assert!(script.contains("\nnum_gpu_per_node=4\n"));
        assert!(script.contains("--zmq-mode=master"));
        assert!(script.ends_with("wait\n"));
    }
}

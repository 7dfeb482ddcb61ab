use std::process::Stdio;

use anyhow::Context as _;

use crate::cli::FloodArgs;

/// Blast the target with short-lived curl processes in fixed-size waves.
///
/// This is a raw collaborator outside the dispatcher: no classification, no
/// stats, just process exit codes. Useful for saturating a target while a
/// measured `run` observes it from the side.
pub async fn flood(args: FloodArgs) -> anyhow::Result<()> {
    for wave in 1..=args.waves {
        let mut children = Vec::with_capacity(args.burst);
        for _ in 0..args.burst {
            let child = tokio::process::Command::new("curl")
                .arg("-s")
                .arg("-o")
                .arg(null_sink())
                .arg("-m")
                .arg(&args.timeout)
                .arg(&args.url)
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .spawn()
                .context("failed to spawn curl (is it installed?)")?;
            children.push(child);
        }

        let mut completed = 0usize;
        for mut child in children {
            let status = child.wait().await?;
            if status.success() {
                completed += 1;
            }
        }

        println!(
            "wave {wave}/{}: {completed}/{} requests completed",
            args.waves, args.burst
        );
    }

    Ok(())
}

fn null_sink() -> &'static str {
    if cfg!(windows) { "NUL" } else { "/dev/null" }
}

use std::path::Path;

use crate::error::Result;
use crate::plan::SagaPlan;

pub(super) fn run(path: &Path) -> Result<()> {
    let plan = SagaPlan::load(path)?;

    println!("plan '{}' is valid: {} steps", plan.id, plan.steps.len());
    for (index, step) in plan.steps.iter().enumerate() {
        let mut markers = Vec::new();
        if step.fail.is_some() {
            markers.push("fails");
        }
        if step.compensation_fail.is_some() {
            markers.push("compensation fails");
        }
        if markers.is_empty() {
            println!("  {}. {}", index + 1, step.name);
        } else {
            println!("  {}. {} ({})", index + 1, step.name, markers.join(", "));
        }
    }

    for name in plan.duplicate_step_names() {
        eprintln!("warning: step name '{name}' is used more than once");
    }
    Ok(())
}

//! Breaking a task that is too long for one round into round-sized steps.

use tracing::debug;

use crate::error::SplitError;
use crate::packer::PackConfig;
use crate::types::Task;

fn slug(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    let mut dash = false;
    for ch in title.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
            dash = false;
        } else if !dash && !out.is_empty() {
            out.push('-');
            dash = true;
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    if out.is_empty() {
        out.push_str("task");
    }
    out
}

/// Split `total_minutes` of work into one task per step.
///
/// Minutes are spread so the steps add up to exactly `total_minutes`; the
/// first `total_minutes % steps` steps carry one extra minute.
pub fn split_task(
    title: &str,
    total_minutes: u32,
    steps: &[String],
    config: &PackConfig,
) -> Result<Vec<Task>, SplitError> {
    config.validate()?;
    if steps.is_empty() {
        return Err(SplitError::NoSteps);
    }
    let limit = config.session_minutes();
    if u64::from(total_minutes) > limit {
        return Err(SplitError::ExceedsSession {
            minutes: total_minutes,
            limit: u32::try_from(limit).unwrap_or(u32::MAX),
        });
    }
    let count = u32::try_from(steps.len()).unwrap_or(u32::MAX);
    let needed = total_minutes.div_ceil(count);
    if needed > config.capacity_minutes {
        return Err(SplitError::StepTooLong {
            needed,
            capacity: config.capacity_minutes,
        });
    }
    if total_minutes < count {
        return Err(SplitError::StepTooShort {
            minutes: total_minutes,
            steps: steps.len(),
        });
    }

    let base = total_minutes / count;
    let extra = (total_minutes % count) as usize;
    let prefix = slug(title);
    let parts = steps
        .iter()
        .enumerate()
        .map(|(i, step)| {
            let minutes = if i < extra { base + 1 } else { base };
            let step_title = if step.trim().is_empty() {
                format!("{} (part {})", title.trim(), i + 1)
            } else {
                step.trim().to_string()
            };
            Task::new(format!("{prefix}-{}", i + 1), step_title, minutes)
        })
        .collect::<Vec<_>>();
    debug!(title, total_minutes, steps = parts.len(), "split task");
    Ok(parts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packer::pack;
    use crate::types::RoundStatus;

    fn steps(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn splits_into_round_sized_steps() {
        let parts = split_task(
            "Write Report!",
            60,
            &steps(&["outline", "draft", "edit"]),
            &PackConfig::default(),
        )
        .expect("split");
        let minutes: Vec<u32> = parts.iter().map(|t| t.estimated_minutes).collect();
        assert_eq!(minutes, vec![20, 20, 20]);
        assert_eq!(parts[0].id, "write-report-1");
        assert_eq!(parts[2].title, "edit");
    }

    #[test]
    fn uneven_split_conserves_minutes() {
        let parts = split_task("essay", 70, &steps(&["", "", ""]), &PackConfig::default())
            .expect("split");
        let minutes: Vec<u32> = parts.iter().map(|t| t.estimated_minutes).collect();
        assert_eq!(minutes, vec![24, 23, 23]);
        assert_eq!(parts[1].title, "essay (part 2)");

        let rounds = pack(&parts, &PackConfig::default()).expect("pack");
        assert!(rounds.iter().all(|r| r.status() != RoundStatus::Overfilled));
    }

    #[test]
    fn rejects_more_than_a_session() {
        let err = split_task("marathon", 120, &steps(&["a"; 5]), &PackConfig::default())
            .expect_err("too big");
        assert_eq!(
            err,
            SplitError::ExceedsSession {
                minutes: 120,
                limit: 100
            }
        );
    }

    #[test]
    fn rejects_steps_longer_than_a_round() {
        let err = split_task("big", 60, &steps(&["a", "b"]), &PackConfig::default())
            .expect_err("step too long");
        assert_eq!(
            err,
            SplitError::StepTooLong {
                needed: 30,
                capacity: 25
            }
        );
    }

    #[test]
    fn rejects_empty_and_zero_minute_steps() {
        assert_eq!(
            split_task("x", 10, &[], &PackConfig::default()),
            Err(SplitError::NoSteps)
        );
        assert_eq!(
            split_task("x", 2, &steps(&["a", "b", "c"]), &PackConfig::default()),
            Err(SplitError::StepTooShort {
                minutes: 2,
                steps: 3
            })
        );
    }

    #[test]
    fn slug_falls_back_for_symbols() {
        assert_eq!(slug("  ***  "), "task");
        assert_eq!(slug("Fix  the -- bug"), "fix-the-bug");
    }
}

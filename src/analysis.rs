//! Offline schedulability analysis
//!
//! Periodic tasks with implicit deadlines (deadline = period). Jobs of one
//! hyperperiod are replayed non-preemptively in a caller chosen order to
//! check deadlines and measure waiting time.

use crate::types::OsTick;

/// Periodic task model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PeriodicTask {
    pub name: &'static str,
    /// Execution time per job (C)
    pub exec: OsTick,
    /// Period and relative deadline (T)
    pub period: OsTick,
}

impl PeriodicTask {
    pub const fn new(name: &'static str, exec: OsTick, period: OsTick) -> Self {
        Self { name, exec, period }
    }
}

/// One release of a periodic task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Job {
    /// Index of the task in the task set
    pub task: usize,
    /// Release number, starting at 1
    pub instance: u64,
    pub exec: OsTick,
    pub arrival: OsTick,
    pub deadline: OsTick,
}

const fn gcd(mut a: OsTick, mut b: OsTick) -> OsTick {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

/// Least common multiple of all periods
///
/// `None` for an empty set, a zero period or on overflow.
pub fn hyperperiod(tasks: &[PeriodicTask]) -> Option<OsTick> {
    let (first, rest) = tasks.split_first()?;
    if first.period == 0 {
        return None;
    }
    rest.iter().try_fold(first.period, |acc, t| {
        if t.period == 0 {
            return None;
        }
        (acc / gcd(acc, t.period)).checked_mul(t.period)
    })
}

/// Every job released in `[0, hyperperiod)`, task by task
pub fn jobs(tasks: &[PeriodicTask]) -> impl Iterator<Item = Job> + '_ {
    let hyper = hyperperiod(tasks).unwrap_or(0);
    tasks.iter().enumerate().flat_map(move |(idx, t)| {
        let count = if t.period == 0 { 0 } else { hyper / t.period };
        (0..count).map(move |i| Job {
            task: idx,
            instance: i + 1,
            exec: t.exec,
            arrival: i * t.period,
            deadline: (i + 1) * t.period,
        })
    })
}

/// Processor demand over one hyperperiod, in per-mille
pub fn utilization(tasks: &[PeriodicTask]) -> Option<u64> {
    let hyper = hyperperiod(tasks)?;
    let demand = tasks.iter().try_fold(0u64, |acc, t| {
        t.exec.checked_mul(hyper / t.period).and_then(|d| acc.checked_add(d))
    })?;
    demand.checked_mul(1000).map(|d| d / hyper)
}

/// Earliest deadline first, ties by arrival then task index
pub fn sort_by_deadline(jobs: &mut [Job]) {
    jobs.sort_unstable_by_key(|j| (j.deadline, j.arrival, j.task, j.instance));
}

/// What happened to one job of a replayed order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum JobOutcome {
    Ran {
        job: Job,
        start: OsTick,
        finish: OsTick,
    },
    /// Would have missed its deadline; allowed to, so it was dropped
    Skipped(Job),
    /// Missed its deadline; the order is infeasible
    Missed(Job),
}

/// Non-preemptive replay of a job order
///
/// The processor idles until a job arrives. Yields one outcome per job and
/// stops after the first [`JobOutcome::Missed`].
pub fn replay<I, F>(order: I, may_miss: F) -> impl Iterator<Item = JobOutcome>
where
    I: IntoIterator<Item = Job>,
    F: Fn(&Job) -> bool,
{
    let mut now: OsTick = 0;
    let mut failed = false;
    order.into_iter().map_while(move |job| {
        if failed {
            return None;
        }
        let start = now.max(job.arrival);
        let finish = start.saturating_add(job.exec);
        if finish <= job.deadline {
            now = finish;
            Some(JobOutcome::Ran {
                job,
                start,
                finish,
            })
        } else if may_miss(&job) {
            Some(JobOutcome::Skipped(job))
        } else {
            failed = true;
            Some(JobOutcome::Missed(job))
        }
    })
}

/// Summary of a feasible order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ScheduleReport {
    /// Sum of `start - arrival` over the jobs that ran
    pub total_waiting: OsTick,
    pub completed: usize,
    pub skipped: usize,
    /// Finish time of the last job that ran
    pub finish: OsTick,
}

/// Check an order for deadline misses
///
/// `None` if a job outside `may_miss` misses its deadline.
pub fn check_schedule<'a, I, F>(order: I, may_miss: F) -> Option<ScheduleReport>
where
    I: IntoIterator<Item = &'a Job>,
    F: Fn(&Job) -> bool,
{
    let mut outcomes = replay(order.into_iter().copied(), may_miss);
    outcomes.try_fold(ScheduleReport::default(), |mut report, outcome| {
        match outcome {
            JobOutcome::Ran { job, start, finish } => {
                report.total_waiting += start - job.arrival;
                report.completed += 1;
                report.finish = finish;
            }
            JobOutcome::Skipped(_) => report.skipped += 1,
            JobOutcome::Missed(_) => return None,
        }
        Some(report)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEVEN: [PeriodicTask; 7] = [
        PeriodicTask::new("T1", 2, 10),
        PeriodicTask::new("T2", 3, 10),
        PeriodicTask::new("T3", 2, 20),
        PeriodicTask::new("T4", 2, 20),
        PeriodicTask::new("T5", 2, 40),
        PeriodicTask::new("T6", 2, 40),
        PeriodicTask::new("T7", 3, 80),
    ];

    #[test]
    fn hyperperiod_and_jobs() {
        assert_eq!(hyperperiod(&SEVEN), Some(80));
        assert_eq!(jobs(&SEVEN).count(), 29);
        assert_eq!(utilization(&SEVEN), Some(837));

        let last_t3 = jobs(&SEVEN).filter(|j| j.task == 2).last().unwrap();
        assert_eq!((last_t3.instance, last_t3.arrival, last_t3.deadline), (4, 60, 80));

        assert_eq!(hyperperiod(&[]), None);
        assert_eq!(hyperperiod(&[PeriodicTask::new("z", 1, 0)]), None);
    }

    #[test]
    fn order_decides_waiting_time() {
        let tasks = [PeriodicTask::new("A", 1, 4), PeriodicTask::new("B", 2, 8)];
        let all: Vec<Job> = jobs(&tasks).collect();
        let (a1, a2, b1) = (all[0], all[1], all[2]);

        let report = check_schedule(&[a1, b1, a2], |_| false).unwrap();
        assert_eq!(report.total_waiting, 1);
        assert_eq!(report.finish, 5);

        let report = check_schedule(&[b1, a1, a2], |_| false).unwrap();
        assert_eq!(report.total_waiting, 2);
    }

    #[test]
    fn deadline_miss_and_skip() {
        let tasks = [PeriodicTask::new("A", 1, 4), PeriodicTask::new("B", 2, 8)];
        let all: Vec<Job> = jobs(&tasks).collect();
        let order = [all[1], all[0], all[2]];

        assert_eq!(check_schedule(&order, |_| false), None);

        let report = check_schedule(&order, |j| j.task == 0).unwrap();
        assert_eq!(report.skipped, 1);
        assert_eq!(report.completed, 2);
        assert_eq!(report.total_waiting, 5);
    }

    #[test]
    fn edf_order_meets_short_deadlines_first() {
        let tasks = [PeriodicTask::new("A", 1, 4), PeriodicTask::new("B", 2, 8)];
        let mut all: Vec<Job> = jobs(&tasks).collect();
        all.reverse();
        sort_by_deadline(&mut all);
        assert_eq!(all[0].task, 0);
        assert!(check_schedule(&all, |_| false).is_some());
    }
}

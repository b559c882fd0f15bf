use crate::layout::*;
use crate::task::{SpanningTask, Task, spanning_tasks};
use chrono::{NaiveDate, Weekday};

fn date(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, month, day).unwrap()
}

fn task(id: &str, start: NaiveDate, end: NaiveDate) -> Task {
    Task::new(id, format!("Task {}", id), start, end)
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

fn stacked(tasks: Vec<Task>) -> TaskStacker {
    let mut stacker = TaskStacker::new(spanning_tasks(tasks));
    stacker.compute_stacks();
    stacker
}

// Track assignment

#[test]
fn test_overlapping_pair_and_free_task() {
    let stacker = stacked(vec![
        task("A", date(1, 1), date(1, 5)),
        task("B", date(1, 3), date(1, 10)),
        task("C", date(1, 12), date(1, 14)),
    ]);

    assert_eq!(stacker.track_of("A"), Some(0));
    assert_eq!(stacker.track_of("B"), Some(1));
    assert_eq!(stacker.track_of("C"), Some(0));
    assert_eq!(stacker.max_tracks(), 2);
}

#[test]
fn test_disjoint_tasks_share_one_track() {
    let tasks = (0..6)
        .map(|i| task(&format!("T{}", i), date(2, 1 + i * 4), date(2, 3 + i * 4)))
        .collect();
    let stacker = stacked(tasks);
    assert_eq!(stacker.max_tracks(), 1);
}

#[test]
fn test_overlapping_tasks_never_share_track() {
    let tasks = vec![
        task("A", date(3, 1), date(3, 20)),
        task("B", date(3, 2), date(3, 4)),
        task("C", date(3, 4), date(3, 9)),
        task("D", date(3, 5), date(3, 5)),
        task("E", date(3, 9), date(3, 25)),
        task("F", date(3, 1), date(3, 1)),
        task("G", date(3, 18), date(3, 30)),
    ];
    let stacker = stacked(tasks.clone());

    for (i, a) in tasks.iter().enumerate() {
        for b in &tasks[i + 1..] {
            if a.overlaps(b) {
                assert_ne!(
                    stacker.track_of(&a.id),
                    stacker.track_of(&b.id),
                    "{} and {} overlap but share a track",
                    a.id,
                    b.id
                );
            }
        }
    }

    // March 4 holds A, B and C
    assert_eq!(stacker.max_tracks(), 3);
}

#[test]
fn test_longer_task_wins_lower_track_on_same_start() {
    let stacker = stacked(vec![
        task("short", date(1, 1), date(1, 2)),
        task("long", date(1, 1), date(1, 10)),
    ]);
    assert_eq!(stacker.track_of("long"), Some(0));
    assert_eq!(stacker.track_of("short"), Some(1));
}

#[test]
fn test_input_order_breaks_full_ties() {
    let stacker = stacked(vec![
        task("first", date(1, 1), date(1, 3)),
        task("second", date(1, 1), date(1, 3)),
    ]);
    assert_eq!(stacker.track_of("first"), Some(0));
    assert_eq!(stacker.track_of("second"), Some(1));
}

#[test]
fn test_compute_stacks_is_deterministic() {
    let mut stacker = stacked(vec![
        task("A", date(1, 1), date(1, 5)),
        task("B", date(1, 3), date(1, 10)),
        task("C", date(1, 4), date(1, 4)),
    ]);
    let snapshot = |stacker: &TaskStacker| -> Vec<(NaiveDate, Vec<(String, usize, u32, u32)>)> {
        stacker
            .days()
            .map(|day| {
                (
                    day.date,
                    day.assignments
                        .iter()
                        .map(|a| (a.task_id().to_string(), a.track, a.start_col, a.end_col))
                        .collect(),
                )
            })
            .collect()
    };

    let first = snapshot(&stacker);
    stacker.compute_stacks();
    assert_eq!(first, snapshot(&stacker));
}

#[test]
fn test_tasks_starting_on_day_excludes_continuations() {
    let stacker = stacked(vec![
        task("A", date(1, 1), date(1, 5)),
        task("B", date(1, 3), date(1, 10)),
    ]);

    let starting: Vec<_> = stacker
        .tasks_starting_on_day(date(1, 3))
        .iter()
        .map(|a| a.task_id().to_string())
        .collect();
    assert_eq!(starting, vec!["B"]);

    let continuing: Vec<_> = stacker
        .tasks_continuing_on_day(date(1, 3))
        .iter()
        .map(|a| a.task_id().to_string())
        .collect();
    assert_eq!(continuing, vec!["A"]);

    assert!(stacker.tasks_starting_on_day(date(1, 4)).is_empty());
    assert_eq!(stacker.stacks_for_day(date(1, 4)).len(), 2);
    assert_eq!(stacker.day_depth(date(1, 4)), 2);
    assert_eq!(stacker.day_depth(date(1, 8)), 2);
    assert_eq!(stacker.day_depth(date(2, 1)), 0);
}

#[test]
fn test_stacks_for_day_sorted_by_track() {
    let stacker = stacked(vec![
        task("late", date(1, 2), date(1, 4)),
        task("early", date(1, 1), date(1, 4)),
    ]);
    let tracks: Vec<_> = stacker
        .stacks_for_day(date(1, 3))
        .iter()
        .map(|a| a.track)
        .collect();
    assert_eq!(tracks, vec![0, 1]);
}

#[test]
fn test_week_columns_clamped_to_row() {
    // 2025-01-01 is a Wednesday
    let stacker = stacked(vec![task("A", date(1, 1), date(1, 8))]);

    let first_week = &stacker.stacks_for_day(date(1, 1))[0];
    assert_eq!((first_week.start_col, first_week.end_col), (2, 6));

    let second_week = &stacker.stacks_for_day(date(1, 7))[0];
    assert_eq!((second_week.start_col, second_week.end_col), (0, 2));

    let segments = stacker.week_segments("A");
    assert_eq!(segments.len(), 2);
    assert_eq!(segments[0].week_start, NaiveDate::from_ymd_opt(2024, 12, 30).unwrap());
    assert_eq!((segments[0].start_col, segments[0].end_col), (2, 6));
    assert_eq!((segments[1].start_col, segments[1].end_col), (0, 2));
}

#[test]
fn test_sunday_week_start() {
    let mut stacker = TaskStacker::new(spanning_tasks(vec![task("A", date(1, 1), date(1, 8))]))
        .with_week_start(Weekday::Sun);
    stacker.compute_stacks();

    let assignment = &stacker.stacks_for_day(date(1, 1))[0];
    assert_eq!((assignment.start_col, assignment.end_col), (3, 6));
    assert_eq!(
        week_start_for(date(1, 1), Weekday::Sun),
        NaiveDate::from_ymd_opt(2024, 12, 29).unwrap()
    );
}

#[test]
fn test_inverted_range_is_skipped_and_reported() {
    let stacker = stacked(vec![
        task("ok", date(1, 1), date(1, 2)),
        task("bad", date(1, 5), date(1, 1)),
    ]);
    assert_eq!(stacker.skipped_tasks(), ["bad".to_string()]);
    assert_eq!(stacker.track_of("bad"), None);
    assert_eq!(stacker.max_tracks(), 1);
}

#[test]
fn test_duplicate_id_keeps_first_task() {
    let stacker = stacked(vec![
        Task::new("X", "First", date(1, 1), date(1, 5)),
        Task::new("X", "Second", date(1, 3), date(1, 8)),
    ]);

    assert_eq!(stacker.track_of("X"), Some(0));
    assert_eq!(stacker.skipped_tasks(), ["X".to_string()]);
    assert_eq!(stacker.max_tracks(), 1);
    let names: Vec<&str> = stacker
        .stacks_for_day(date(1, 4))
        .iter()
        .map(|assignment| assignment.task.task.name.as_str())
        .collect();
    assert_eq!(names, ["First"]);
}

#[test]
fn test_track_cap_reuses_last_track() {
    let tasks = (0..=MAX_TRACKS)
        .map(|i| task(&format!("T{}", i), date(1, 1), date(1, 2)))
        .collect();
    let stacker = stacked(tasks);

    assert_eq!(stacker.track_of("T99"), Some(MAX_TRACKS - 1));
    assert_eq!(stacker.track_of("T100"), Some(MAX_TRACKS - 1));
    assert_eq!(stacker.max_tracks(), MAX_TRACKS);
}

// Overlap analysis

fn analyze(tasks: Vec<Task>) -> OverlapAnalysis {
    OverlapAnalyzer::new().analyze(&spanning_tasks(tasks))
}

#[test]
fn test_overlap_types_and_severity() {
    let cases = [
        ((date(1, 1), date(1, 5)), (date(1, 1), date(1, 5)), OverlapType::Identical, ConflictSeverity::Critical),
        ((date(1, 1), date(1, 10)), (date(1, 3), date(1, 4)), OverlapType::Nested, ConflictSeverity::High),
        ((date(1, 1), date(1, 5)), (date(1, 5), date(1, 9)), OverlapType::Adjacent, ConflictSeverity::Low),
        ((date(1, 1), date(1, 10)), (date(1, 2), date(1, 11)), OverlapType::Partial, ConflictSeverity::High),
        ((date(1, 1), date(1, 10)), (date(1, 6), date(1, 15)), OverlapType::Partial, ConflictSeverity::Medium),
        ((date(1, 1), date(1, 10)), (date(1, 9), date(1, 20)), OverlapType::Partial, ConflictSeverity::Low),
    ];

    for ((a_start, a_end), (b_start, b_end), expected_type, expected_severity) in cases {
        let analysis = analyze(vec![task("A", a_start, a_end), task("B", b_start, b_end)]);
        assert_eq!(analysis.overlaps.len(), 1);
        let overlap = &analysis.overlaps[0];
        assert_eq!(overlap.overlap_type, expected_type);
        assert_eq!(overlap.severity, expected_severity);
    }
}

#[test]
fn test_overlap_range_and_ratio() {
    let analysis = analyze(vec![
        task("A", date(1, 1), date(1, 10)),
        task("B", date(1, 6), date(1, 15)),
    ]);
    let overlap = &analysis.overlaps[0];
    assert_eq!(overlap.first, "A");
    assert_eq!(overlap.second, "B");
    assert_eq!(overlap.overlap_start, date(1, 6));
    assert_eq!(overlap.overlap_end, date(1, 10));
    assert_eq!(overlap.overlap_days, 5);
    assert!(approx(overlap.overlap_ratio, 0.5));
}

#[test]
fn test_severity_monotonic_in_ratio() {
    let ratios = [0.1, 0.3, 0.5, 0.6, 0.8, 0.95, 1.0];
    for pair in ratios.windows(2) {
        assert!(ConflictSeverity::from_ratio(pair[1]) >= ConflictSeverity::from_ratio(pair[0]));
    }
}

#[test]
fn test_transitive_groups() {
    let analysis = analyze(vec![
        task("D", date(1, 20), date(1, 21)),
        task("A", date(1, 1), date(1, 5)),
        task("B", date(1, 4), date(1, 8)),
        task("C", date(1, 8), date(1, 10)),
    ]);

    assert_eq!(analysis.groups.len(), 2);
    assert_eq!(analysis.groups[0].tasks, vec!["A", "B", "C"]);
    assert_eq!(analysis.groups[0].end_date, date(1, 10));
    assert_eq!(analysis.groups[0].overlap_count, 2);
    assert_eq!(analysis.groups[1].tasks, vec!["D"]);
    assert!(!analysis.groups[1].is_conflicted());
    assert_eq!(analysis.groups[1].max_severity, None);

    assert!(analysis.is_conflicted("A"));
    assert!(!analysis.is_conflicted("D"));
    assert_eq!(
        analysis.group_of("C").map(|g| g.tasks.len()),
        Some(3)
    );
    assert_eq!(analysis.overlaps_for("B").len(), 2);
}

#[test]
fn test_analysis_summary_counts() {
    let analysis = analyze(vec![
        task("A", date(1, 1), date(1, 5)),
        task("B", date(1, 1), date(1, 5)),
    ]);
    assert!(analysis.has_critical_overlaps());
    assert_eq!(analysis.severity_counts().get(&ConflictSeverity::Critical), Some(&1));
    assert!(analysis.summary().contains("Critical: 1"));
}

#[test]
fn test_analyzer_ignores_inverted_ranges() {
    let analysis = analyze(vec![
        task("A", date(1, 1), date(1, 5)),
        task("bad", date(1, 4), date(1, 2)),
    ]);
    assert!(analysis.overlaps.is_empty());
    assert_eq!(analysis.groups.len(), 1);
}

// Priority ranking

#[test]
fn test_priority_extremes() {
    let ranker = PriorityRanker::default();

    let top = task("top", date(1, 1), date(3, 1))
        .with_category("DISSERTATION")
        .as_milestone();
    let score = ranker.score_task(&top, None);
    assert!(approx(score.score, 1.0));
    assert_eq!(score.prominence, VisualProminence::Critical);

    let plain = task("plain", date(1, 1), date(1, 1));
    let score = ranker.score_task(&plain, None);
    assert!(approx(score.score, 0.5 * 0.0625));
    assert_eq!(score.prominence, VisualProminence::Minimal);
    assert_eq!(score.urgency, None);
}

#[test]
fn test_category_lookup_is_case_insensitive() {
    let ranker = PriorityRanker::default();
    let score = ranker.score_task(&task("p", date(1, 1), date(1, 1)).with_category("proposal"), None);
    assert!(approx(score.category_score, 0.75));
}

#[test]
fn test_duration_factor_buckets() {
    let ranker = PriorityRanker::default();
    let factor = |days: i64| {
        let end = date(1, 1) + chrono::Duration::days(days);
        ranker.score_task(&task("d", date(1, 1), end), None).duration_score
    };
    assert!(approx(factor(1), 0.0));
    assert!(approx(factor(2), 1.0 / 3.0));
    assert!(approx(factor(8), 2.0 / 3.0));
    assert!(approx(factor(31), 1.0));
}

#[test]
fn test_ranking_order_and_ties() {
    let tasks = spanning_tasks(vec![
        task("a", date(1, 1), date(1, 1)),
        task("b", date(1, 1), date(1, 1)).as_milestone(),
        task("c", date(1, 1), date(1, 1)),
    ]);
    let ranking = PriorityRanker::default().rank(&tasks, None);
    let ranked: Vec<_> = ranking.ranked().iter().map(|s| s.task_id.as_str()).collect();
    assert_eq!(ranked, vec!["b", "a", "c"]);
    assert_eq!(ranking.get("c").map(|s| s.display_rank), Some(3));
}

#[test]
fn test_urgency_is_informational() {
    let ranker = PriorityRanker::default();
    let today = date(6, 15);
    let urgency = |t: Task| ranker.score_task(&t, Some(today)).urgency;

    assert_eq!(urgency(task("o", date(6, 1), date(6, 10))), Some(Urgency::Overdue));
    assert_eq!(
        urgency(task("p", date(6, 1), date(6, 10)).with_status(crate::task::TaskStatus::Completed)),
        Some(Urgency::Past)
    );
    assert_eq!(urgency(task("a", date(6, 10), date(6, 20))), Some(Urgency::Active));
    assert_eq!(urgency(task("u", date(6, 20), date(6, 22))), Some(Urgency::Upcoming));
    assert_eq!(urgency(task("f", date(9, 1), date(9, 2))), Some(Urgency::Future));

    let with_date = ranker.score_task(&task("x", date(6, 1), date(6, 10)), Some(today));
    let without = ranker.score_task(&task("x", date(6, 1), date(6, 10)), None);
    assert!(approx(with_date.score, without.score));
}

#[test]
fn test_custom_weights() {
    let ranker = PriorityRanker::default().with_weights(ScoringWeights {
        category_weight: 0.0,
        milestone_weight: 1.0,
        duration_weight: 0.0,
    });
    let score = ranker.score_task(&task("m", date(1, 1), date(1, 1)).as_milestone(), None);
    assert!(approx(score.score, 1.0));
}

// Rules and stacking engine

fn context(available_height: f64) -> StackingContext {
    StackingContext::new(200.0, available_height, VisualConstraints::default())
}

fn stack(tasks: Vec<Task>, available_height: f64) -> (StackingResult, StackingContext) {
    let mut ctx = context(available_height);
    let result = StackingEngine::new().stack_tasks(&spanning_tasks(tasks), &mut ctx);
    (result, ctx)
}

#[test]
fn test_single_milestone_floats_on_top() {
    let (result, _) = stack(vec![task("M", date(1, 1), date(1, 1)).as_milestone()], 100.0);
    let action = result.action_for("M").unwrap();

    assert_eq!(action.stacking_type, StackingType::Floating);
    assert_eq!(action.rule, "milestone");
    assert!(action.collision_avoidance);
    assert!(approx(action.height, 40.0));
    assert!(approx(action.width, 200.0));

    let highest = default_rules().iter().map(|r| r.action.z_index).max().unwrap();
    assert_eq!(action.z_index, highest);
}

#[test]
fn test_milestone_rule_beats_conflict_rule() {
    let (result, _) = stack(
        vec![
            task("M", date(1, 2), date(1, 2)).as_milestone(),
            task("W", date(1, 1), date(1, 4)),
        ],
        200.0,
    );
    assert_eq!(result.action_for("M").unwrap().stacking_type, StackingType::Floating);

    let conflicted = result.action_for("W").unwrap();
    assert_eq!(conflicted.stacking_type, StackingType::Cascading);
    assert!(approx(conflicted.height, 32.0));
    assert!(approx(conflicted.width, 160.0));
    assert!(approx(conflicted.vertical_offset, 5.0));
    assert_eq!(conflicted.z_index, 7);
}

#[test]
fn test_duration_rules() {
    let (result, _) = stack(
        vec![
            task("long", date(1, 1), date(1, 9)),
            task("short", date(2, 1), date(2, 2)),
            task("mid", date(3, 1), date(3, 4)),
        ],
        500.0,
    );

    let long = result.action_for("long").unwrap();
    assert_eq!(long.stacking_type, StackingType::Horizontal);
    assert!(approx(long.height, 20.0));
    assert!(approx(long.width, 200.0));
    assert_eq!(long.z_index, 5);

    let short = result.action_for("short").unwrap();
    assert_eq!(short.stacking_type, StackingType::Vertical);
    assert_eq!(short.z_index, 3);

    let mid = result.action_for("mid").unwrap();
    assert_eq!(mid.rule, DEFAULT_RULE_NAME);
    assert_eq!(mid.z_index, 2);
}

#[test]
fn test_overflowing_stack_minimizes_tasks() {
    let tasks = (0..6)
        .map(|i| task(&format!("T{}", i), date(1, 1 + i * 4), date(1, 3 + i * 4)))
        .collect();
    let (result, _) = stack(tasks, 100.0);

    assert_eq!(result.metrics.total_stacks, 6);
    assert!(result.metrics.overflow_count > 0);
    assert_eq!(result.metrics.overflow_count, 2);
    assert_eq!(result.metrics.collision_count, 0);

    let minimized = result.stacks_by_type(StackingType::Minimized);
    assert_eq!(minimized.len(), 3);
    let t3 = result.positioned("T3").unwrap();
    assert!(approx(t3.height, 10.0));
    assert!(approx(t3.y, 66.0));

    assert!(approx(result.metrics.space_efficiency, 1.0));
    assert!(approx(result.metrics.visual_quality, 1.0 - 2.0 / 6.0));
    assert!(!result.recommendations.is_empty());
}

#[test]
fn test_group_layout_is_top_down_without_collisions() {
    let (result, ctx) = stack(
        vec![
            task("A", date(1, 1), date(1, 5)),
            task("B", date(1, 3), date(1, 6)),
            task("C", date(1, 4), date(1, 4)),
        ],
        1000.0,
    );
    assert_eq!(result.stacks.len(), 1);
    let stack = &result.stacks[0];
    assert_eq!(stack.stacking_type, StackingType::Cascading);
    assert_eq!(stack.max_severity, Some(ConflictSeverity::High));

    for pair in stack.tasks.windows(2) {
        assert!(pair[1].y > pair[0].bottom());
    }
    assert_eq!(result.metrics.collision_count, 0);
    assert!(ctx.overlaps.is_some());
    assert!(ctx.priorities.is_some());
    assert!(approx(ctx.placed_height(), stack.total_height));
}

#[test]
fn test_stacks_continue_below_existing_context() {
    let mut ctx = context(1000.0);
    let engine = StackingEngine::new();
    engine.stack_tasks(&spanning_tasks(vec![task("A", date(1, 1), date(1, 3))]), &mut ctx);
    let before = ctx.placed_height();

    let second = engine.stack_tasks(&spanning_tasks(vec![task("B", date(2, 1), date(2, 3))]), &mut ctx);
    assert!(approx(second.positioned("B").unwrap().y, before));
    assert_eq!(second.stacks[0].id, "stack_2");
}

#[test]
fn test_collision_detection_threshold() {
    let base = SpanningTask::new(task("A", date(1, 1), date(1, 1)));
    let action = default_rules()[5].action.resolve("default", &VisualConstraints::default());
    let boxed = |x: f64, y: f64| PositionedTask {
        task: base.clone(),
        action: action.clone(),
        x,
        y,
        width: 50.0,
        height: 20.0,
        prominence: None,
        collides: false,
        overflows: false,
    };

    let a = boxed(0.0, 0.0);
    assert!(!a.collides_with(&boxed(0.0, 20.0)), "touching boxes do not collide");
    assert!(!a.collides_with(&boxed(50.0, 0.0)));

    let sliver = boxed(0.0, 19.0);
    assert!(a.collides_with(&sliver));
    assert!(approx(a.intersection_area(&sliver), 50.0));
    assert!(!a.collides_severely_with(&sliver, 0.1), "5% overlap is under threshold");

    let half = boxed(0.0, 10.0);
    assert!(a.collides_with(&half));
    assert!(a.collides_severely_with(&half, 0.1));
}

fn shifted_engine(vertical_offset: f64) -> StackingEngine {
    StackingEngine::new().with_rules(RuleTable::new(vec![StackingRule::new(
        "shifted",
        "Every task pulled up by a fixed offset",
        RuleCondition::Always,
        ActionTemplate {
            stacking_type: StackingType::Vertical,
            height: SizeSpec::Fixed(20.0),
            width: SizeSpec::Max,
            z_index: 0,
            vertical_offset,
            horizontal_offset: 0.0,
            collision_avoidance: false,
        },
    )]))
}

fn overlapping_pair() -> Vec<SpanningTask> {
    spanning_tasks(vec![
        task("A", date(1, 1), date(1, 5)),
        task("B", date(1, 3), date(1, 8)),
    ])
}

#[test]
fn test_negative_offset_stays_below_stack_top() {
    let mut ctx = context(500.0);
    let result = shifted_engine(-3.0).stack_tasks(&overlapping_pair(), &mut ctx);
    assert!(approx(result.positioned("A").unwrap().y, 0.0));

    let later = shifted_engine(-30.0).stack_tasks(
        &spanning_tasks(vec![task("C", date(2, 1), date(2, 2))]),
        &mut ctx,
    );
    // A and B end at 39, plus spacing
    assert!(approx(later.positioned("C").unwrap().y, 41.0));
}

#[test]
fn test_any_intersection_counts_as_collision() {
    let mut ctx = context(500.0);
    let result = shifted_engine(-3.0).stack_tasks(&overlapping_pair(), &mut ctx);
    // A at 0..20, B pulled up to 19..39
    assert!(approx(result.positioned("B").unwrap().y, 19.0));
    assert!(result.positioned("B").unwrap().collides);
    assert_eq!(result.metrics.collision_count, 1);
    assert_eq!(result.metrics.severe_collision_count, 0);
    assert!(approx(result.metrics.visual_quality, 0.5));
    assert!(result.summary().contains("Collisions: 1 (0 severe)"));

    let mut ctx = context(500.0);
    let deep = shifted_engine(-12.0).stack_tasks(&overlapping_pair(), &mut ctx);
    // B at 10..30 covers half of A
    assert_eq!(deep.metrics.collision_count, 1);
    assert_eq!(deep.metrics.severe_collision_count, 1);
}

#[test]
fn test_duplicate_id_is_skipped_by_engine() {
    let tasks = spanning_tasks(vec![
        Task::new("X", "First", date(1, 1), date(1, 5)),
        Task::new("X", "Second", date(1, 3), date(1, 8)),
    ]);
    let mut ctx = context(500.0);
    let result = StackingEngine::new().stack_tasks(&tasks, &mut ctx);

    assert_eq!(result.metrics.total_tasks, 1);
    assert_eq!(result.positioned("X").unwrap().task.task.name, "First");
    assert_eq!(result.skipped, vec!["X".to_string()]);
}

#[test]
fn test_custom_rule_order() {
    let mut rules = default_rules();
    rules.swap(0, 1);
    let engine = StackingEngine::new().with_rules(RuleTable::new(rules));
    let mut ctx = context(500.0);
    let result = engine.stack_tasks(
        &spanning_tasks(vec![
            task("M", date(1, 2), date(1, 2)).as_milestone(),
            task("W", date(1, 1), date(1, 4)),
        ]),
        &mut ctx,
    );
    assert_eq!(result.action_for("M").unwrap().stacking_type, StackingType::Cascading);
}

#[test]
fn test_rule_table_without_catch_all_falls_back() {
    let table = RuleTable::new(vec![default_rules().remove(0)]);
    let plain = task("p", date(1, 1), date(1, 3));
    let facts = RuleFacts {
        task: &plain,
        in_conflict: false,
        would_overflow: false,
        prominence: None,
    };
    let action = table.evaluate(&facts, &VisualConstraints::default());
    assert_eq!(action.stacking_type, StackingType::Vertical);
    assert_eq!(action.rule, DEFAULT_RULE_NAME);
}

#[test]
fn test_added_rule_runs_before_catch_all() {
    let mut table = RuleTable::default();
    table.add_rule(StackingRule::new(
        "admin",
        "Admin work is always minimized",
        RuleCondition::CategoryIn {
            categories: vec!["ADMIN".to_string()],
        },
        ActionTemplate {
            stacking_type: StackingType::Minimized,
            height: SizeSpec::Fixed(8.0),
            width: SizeSpec::Min,
            z_index: 0,
            vertical_offset: 0.0,
            horizontal_offset: 0.0,
            collision_avoidance: false,
        },
    ));
    assert_eq!(table.rules().last().unwrap().name, DEFAULT_RULE_NAME);

    let admin = task("a", date(1, 1), date(1, 4)).with_category("admin");
    let facts = RuleFacts {
        task: &admin,
        in_conflict: false,
        would_overflow: false,
        prominence: None,
    };
    let action = table.evaluate(&facts, &VisualConstraints::default());
    assert_eq!(action.rule, "admin");
    assert!(approx(action.height, 8.0));
}

#[test]
fn test_window_excludes_outside_tasks() {
    let mut ctx = context(500.0).with_window(CalendarWindow::month(2025, 1).unwrap());
    let result = StackingEngine::new().stack_tasks(
        &spanning_tasks(vec![
            task("jan", date(1, 30), date(2, 3)),
            task("mar", date(3, 1), date(3, 2)),
            task("bad", date(1, 9), date(1, 2)),
        ]),
        &mut ctx,
    );
    assert!(result.positioned("jan").is_some());
    assert!(result.positioned("mar").is_none());
    assert_eq!(result.skipped, vec!["bad".to_string()]);
}

#[test]
fn test_empty_input_metrics() {
    let (result, _) = stack(Vec::new(), 100.0);
    assert_eq!(result.metrics.total_tasks, 0);
    assert!(approx(result.metrics.visual_quality, 1.0));
    assert!(approx(result.metrics.space_efficiency, 0.0));
    assert!(result.summary().contains("Total Stacks: 0"));
}

// Sizing, positioning and space optimization

#[test]
fn test_natural_heights() {
    let calc = HeightCalculator::default();
    let constraints = VisualConstraints::default();

    let normal = task("n", date(1, 1), date(1, 2)).with_description("x");
    let normal = Task {
        name: "Write chapter".to_string(),
        ..normal
    };
    assert_eq!(calc.complexity(&normal), ContentComplexity::Normal);
    assert!(approx(calc.natural_height(&normal, &constraints), 20.0));

    let long = Task {
        end_date: date(1, 20),
        ..normal.clone()
    };
    assert!(approx(calc.natural_height(&long, &constraints), 24.0));

    let complex_long = long.clone().with_category("DISSERTATION");
    assert_eq!(calc.complexity(&complex_long), ContentComplexity::Complex);
    assert!(approx(calc.natural_height(&complex_long, &constraints), 31.2));

    let tight = VisualConstraints {
        max_task_height: 25.0,
        ..VisualConstraints::default()
    };
    assert!(approx(calc.natural_height(&complex_long, &tight), 25.0));
}

#[test]
fn test_natural_height_bounds_come_from_constraints() {
    let calc = HeightCalculator::new(HeightConfig {
        base_height: 4.0,
        ..HeightConfig::default()
    });
    let short = Task::new("s", "Write chapter", date(1, 1), date(1, 2));
    assert_eq!(calc.complexity(&short), ContentComplexity::Normal);
    assert!(approx(calc.natural_height(&short, &VisualConstraints::default()), 20.0));

    let roomy = VisualConstraints {
        min_task_height: 2.0,
        max_task_height: 200.0,
        ..VisualConstraints::default()
    };
    let tall = HeightCalculator::new(HeightConfig {
        base_height: 100.0,
        ..HeightConfig::default()
    });
    assert!(approx(tall.natural_height(&short, &roomy), 100.0));
}

#[test]
fn test_content_complexity() {
    let calc = HeightCalculator::default();
    let named = |name: &str| Task::new("c", name, date(1, 1), date(1, 1));

    assert_eq!(calc.complexity(&named("Lab")), ContentComplexity::Minimal);
    assert_eq!(calc.complexity(&named("Lab").as_milestone()), ContentComplexity::Complex);
    assert_eq!(
        calc.complexity(&named("A very long task name that wraps around")),
        ContentComplexity::Complex
    );
    assert_eq!(calc.complexity(&named("Lab").with_category("proposal")), ContentComplexity::Complex);
    assert_eq!(calc.complexity(&named("Literature review")), ContentComplexity::Normal);
}

#[test]
fn test_visual_weight() {
    let calc = HeightCalculator::default();
    let weighted = task("w", date(1, 1), date(1, 3))
        .with_category("DISSERTATION")
        .as_milestone();
    assert!(approx(calc.visual_weight(&weighted), 1.0 + 0.48 + 2.0 + 3.0));
}

fn placement(height: f64, complexity: ContentComplexity) -> PlacementInput {
    PlacementInput {
        height,
        complexity,
        is_milestone: false,
    }
}

#[test]
fn test_alignment_policy() {
    let positions = PositionCalculator::default();
    let one = [placement(20.0, ContentComplexity::Normal)];
    assert_eq!(positions.determine_alignment(&one, 100.0), Alignment::Center);

    let two = [one[0], one[0]];
    assert_eq!(positions.determine_alignment(&two, 100.0), Alignment::Top);

    let milestone = [PlacementInput {
        is_milestone: true,
        ..one[0]
    }];
    assert_eq!(positions.determine_alignment(&milestone, 100.0), Alignment::Top);
}

#[test]
fn test_content_distribution_nudges() {
    let positions = PositionCalculator::default();
    let entries = [
        placement(20.0, ContentComplexity::Complex),
        placement(20.0, ContentComplexity::Minimal),
        placement(20.0, ContentComplexity::Normal),
    ];
    assert_eq!(positions.determine_distribution(&entries), Distribution::Content);

    let ys = positions.positions(&entries, 2.0, Alignment::Top, Distribution::Content, 100.0);
    assert_eq!(ys, vec![5.0, 25.0, 47.0]);

    let even = positions.positions(&entries, 2.0, Alignment::Top, Distribution::Even, 100.0);
    assert_eq!(even, vec![0.0, 22.0, 44.0]);
    assert!(approx(positions.stack_height(&entries, 2.0, Distribution::Even), 64.0));
}

fn vertical_stack(heights: &[f64], alignment: Alignment) -> VerticalStack {
    VerticalStack {
        stack_id: "stack_1".to_string(),
        entries: heights
            .iter()
            .enumerate()
            .map(|(i, &height)| VerticalEntry {
                task_id: format!("T{}", i),
                complexity: ContentComplexity::Normal,
                is_milestone: false,
                natural_height: height,
                height,
                y: 0.0,
                visual_weight: 1.0,
            })
            .collect(),
        alignment,
        distribution: Distribution::Even,
        spacing: 2.0,
        scale_state: ScaleState::Natural,
        scale_factor: 1.0,
        total_height: 0.0,
    }
}

#[test]
fn test_compression_is_idempotent() {
    let optimizer = SpaceOptimizer::default();
    let mut stack = vertical_stack(&[20.0; 5], Alignment::Top);

    optimizer.optimize(&mut stack, 100.0);
    assert_eq!(stack.scale_state, ScaleState::Compressed);
    assert!(approx(stack.scale_factor, 100.0 / 108.0));
    let first = stack.clone();

    optimizer.optimize(&mut stack, 100.0);
    assert_eq!(stack, first);
    for pair in stack.entries.windows(2) {
        assert!(approx(pair[1].y, pair[0].y + pair[0].height + 2.0));
    }
}

#[test]
fn test_expansion_is_capped_and_idempotent() {
    let optimizer = SpaceOptimizer::default();
    let mut stack = vertical_stack(&[20.0], Alignment::Top);

    optimizer.optimize(&mut stack, 100.0);
    assert_eq!(stack.scale_state, ScaleState::Expanded);
    assert!(approx(stack.entries[0].height, 30.0));

    optimizer.optimize(&mut stack, 100.0);
    assert!(approx(stack.entries[0].height, 30.0));
}

#[test]
fn test_comfortable_stack_is_left_alone() {
    let optimizer = SpaceOptimizer::default();
    let mut stack = vertical_stack(&[34.0, 34.0], Alignment::Top);
    optimizer.optimize(&mut stack, 100.0);
    assert_eq!(stack.scale_state, ScaleState::Natural);
    assert!(approx(stack.total_height, 70.0));
}

#[test]
fn test_center_alignment_shifts_stack() {
    let optimizer = SpaceOptimizer::default();
    let mut stack = vertical_stack(&[20.0], Alignment::Center);
    optimizer.optimize(&mut stack, 100.0);
    assert!(approx(stack.entries[0].y, 35.0));
    assert!(approx(stack.total_height, 30.0));
}

#[test]
fn test_zero_available_height_keeps_natural_heights() {
    let optimizer = SpaceOptimizer::default();
    let mut stack = vertical_stack(&[20.0, 20.0], Alignment::Top);
    optimizer.optimize(&mut stack, 0.0);
    assert_eq!(stack.scale_state, ScaleState::Natural);
    assert!(approx(stack.entries[1].y, 22.0));
    assert!(approx(stack.space_efficiency(0.0), 0.0));
}

#[test]
fn test_zero_available_height_efficiency_matches_engine() {
    let tasks = vec![task("A", date(1, 1), date(1, 5))];
    let (stacking, ctx) = stack(tasks, 0.0);
    let vertical = VerticalStacker::default().stack_vertically(&stacking, &ctx);

    assert!(approx(stacking.metrics.space_efficiency, 0.0));
    assert!(approx(vertical.space_efficiency, 0.0));
}

#[test]
fn test_visual_balance() {
    let mut stack = vertical_stack(&[20.0, 20.0], Alignment::Top);
    assert!(approx(stack.visual_balance(), 1.0));
    stack.entries[0].visual_weight = 3.0;
    // average 2, deviations 0.5 + 0.5
    assert!(approx(stack.visual_balance(), 0.9));
}

#[test]
fn test_layout_pass_end_to_end() {
    let tasks = vec![
        task("A", date(1, 1), date(1, 5)).with_category("PROPOSAL"),
        task("B", date(1, 3), date(1, 10)),
        task("C", date(1, 12), date(1, 14)),
        task("M", date(1, 20), date(1, 20)).as_milestone(),
    ];
    let output = LayoutPass::default().run(tasks, CalendarWindow::month(2025, 1), Some(date(1, 15)));

    assert_eq!(output.stacker.max_tracks(), 2);
    assert_eq!(output.stacking.stacks.len(), 3);
    assert_eq!(output.vertical.stacks.len(), 3);
    assert_eq!(
        output.stacking.action_for("M").map(|a| a.stacking_type),
        Some(StackingType::Floating)
    );
    for id in ["A", "B", "C", "M"] {
        assert!(output.vertical.height_of(id).is_some(), "missing height for {}", id);
    }
}

#[test]
fn test_layout_pass_drops_repeated_ids() {
    let tasks = vec![
        Task::new("X", "First", date(1, 1), date(1, 5)),
        Task::new("X", "Second", date(1, 3), date(1, 8)),
    ];
    let output = LayoutPass::default().run(tasks, CalendarWindow::month(2025, 1), None);

    assert_eq!(output.stacker.track_of("X"), Some(0));
    assert_eq!(output.stacking.skipped, vec!["X".to_string()]);
    let names: Vec<&str> = output
        .stacking
        .stacks
        .iter()
        .flat_map(|stack| stack.tasks.iter())
        .map(|positioned| positioned.task.task.name.as_str())
        .collect();
    assert_eq!(names, ["First"]);
}

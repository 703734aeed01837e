use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph, Sparkline},
    Frame,
};

use super::training_dashboard::{DashboardState, TrainingStatus};

/// Render the full training dashboard.
pub fn render(frame: &mut Frame, dashboard: &DashboardState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(10),   // Main content
            Constraint::Length(3), // Footer
        ])
        .split(frame.area());

    render_header(frame, dashboard, chunks[0]);
    render_main(frame, dashboard, chunks[1]);
    render_footer(frame, chunks[2]);
}

fn render_header(frame: &mut Frame, dashboard: &DashboardState, area: Rect) {
    let (status_str, status_color) = match dashboard.status {
        TrainingStatus::Starting => ("LOADING", Color::Gray),
        TrainingStatus::Running => ("RUNNING", Color::Green),
        TrainingStatus::Paused => ("PAUSED", Color::Yellow),
        TrainingStatus::Finished => ("FINISHED", Color::Cyan),
        TrainingStatus::Failed => ("FAILED", Color::Red),
    };

    let header_text = Line::from(vec![
        Span::styled(
            "cube-whisper training",
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ),
        Span::raw("  |  "),
        Span::raw(format!(
            "Epoch: {} (+{} this run)",
            dashboard.epoch(),
            dashboard.epochs_this_run()
        )),
        Span::raw("  |  ["),
        Span::styled(
            status_str,
            Style::default().fg(status_color).add_modifier(Modifier::BOLD),
        ),
        Span::raw("]"),
    ]);

    let header = Paragraph::new(header_text)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));

    frame.render_widget(header, area);
}

fn render_main(frame: &mut Frame, dashboard: &DashboardState, area: Rect) {
    let main_cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
        .split(area);

    let left_rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(8), Constraint::Length(3)])
        .split(main_cols[0]);

    render_cost_chart(frame, dashboard, left_rows[0]);
    render_epoch_time_sparkline(frame, dashboard, left_rows[1]);
    render_stats_panel(frame, dashboard, main_cols[1]);
}

fn render_cost_chart(frame: &mut Frame, dashboard: &DashboardState, area: Rect) {
    let cost_data: Vec<(f64, f64)> = dashboard.cost_history.iter().copied().collect();
    let cross_data: Vec<(f64, f64)> = dashboard.cross_history.iter().copied().collect();

    let (x_min, x_max) = x_bounds(&cost_data, &cross_data, dashboard.starting_epoch);

    let y_max = cost_data
        .iter()
        .chain(cross_data.iter())
        .map(|&(_, y)| y)
        .filter(|y| y.is_finite())
        .fold(1.0_f64, f64::max);
    let y_max = y_max.ceil();

    let mut datasets = vec![];
    if !cost_data.is_empty() {
        datasets.push(
            Dataset::default()
                .name("Training")
                .marker(symbols::Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(Color::Green))
                .data(&cost_data),
        );
    }
    if !cross_data.is_empty() {
        datasets.push(
            Dataset::default()
                .name("Validation")
                .marker(symbols::Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(Color::Cyan))
                .data(&cross_data),
        );
    }

    let x_labels = vec![
        Span::raw(format!("{}", x_min as usize)),
        Span::raw(format!("{}", x_max as usize)),
    ];
    let y_labels = vec![Span::raw("0"), Span::raw(format!("{:.1}", y_max))];

    let chart = Chart::new(datasets)
        .block(Block::default().borders(Borders::ALL).title("CTC Cost"))
        .x_axis(
            Axis::default()
                .title("Epoch")
                .labels(x_labels)
                .bounds([x_min, x_max]),
        )
        .y_axis(
            Axis::default()
                .title("Cost")
                .labels(y_labels)
                .bounds([0.0, y_max]),
        );

    frame.render_widget(chart, area);
}

fn render_epoch_time_sparkline(frame: &mut Frame, dashboard: &DashboardState, area: Rect) {
    let data: Vec<u64> = dashboard.epoch_secs_history.iter().copied().collect();
    let title = match &dashboard.last_report {
        Some(report) => format!("Epoch Time (last: {:.1}s)", report.duration.as_secs_f64()),
        None => "Epoch Time".to_string(),
    };

    let sparkline = Sparkline::default()
        .block(Block::default().borders(Borders::ALL).title(title))
        .data(&data)
        .style(Style::default().fg(Color::Magenta));

    frame.render_widget(sparkline, area);
}

fn stat_line(name: &'static str, value: String) -> Line<'static> {
    Line::from(vec![
        Span::styled(name, Style::default().fg(Color::White)),
        Span::raw(value),
    ])
}

fn render_stats_panel(frame: &mut Frame, dashboard: &DashboardState, area: Rect) {
    let mut lines = vec![
        stat_line("Training:   ", format!("{} samples", dashboard.training_samples)),
        stat_line("Validation: ", format!("{} samples", dashboard.validation_samples)),
        Line::from(""),
    ];

    match &dashboard.last_report {
        Some(report) => {
            lines.push(Line::from(vec![
                Span::styled("Cost:       ", Style::default().fg(Color::White)),
                Span::styled(
                    format!("{:e}", report.train_cost),
                    Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
                ),
            ]));
            if let Some(cross) = report.validation_cost {
                lines.push(Line::from(vec![
                    Span::styled("Cross:      ", Style::default().fg(Color::White)),
                    Span::styled(
                        format!("{:e}", cross),
                        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                    ),
                ]));
            }
            lines.push(stat_line("Batch Loss: ", format!("{:.4}", report.batch_loss)));
            lines.push(stat_line("Recent Loss:", format!(" {:.4}", report.recent_loss)));
            lines.push(stat_line("Batches:    ", report.total_batches.to_string()));
        }
        None => lines.push(Line::from(Span::styled(
            "Waiting for first epoch...",
            Style::default().fg(Color::DarkGray),
        ))),
    }

    if let Some(best) = dashboard.best_cross {
        lines.push(stat_line("Best Cross: ", format!("{:e}", best)));
    }

    if let Some(ref ckpt) = dashboard.last_checkpoint {
        lines.push(Line::from(""));
        lines.push(Line::from(vec![
            Span::styled("Last Save: ", Style::default().fg(Color::White)),
            Span::styled(ckpt.clone(), Style::default().fg(Color::DarkGray)),
        ]));
    }

    if let Some(ref failure) = dashboard.failure {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            failure.clone(),
            Style::default().fg(Color::Red),
        )));
    }

    let stats = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Stats"));

    frame.render_widget(stats, area);
}

fn render_footer(frame: &mut Frame, area: Rect) {
    let footer = Paragraph::new("P: Pause/Resume  |  Q: Quit & Save")
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title("Controls"));

    frame.render_widget(footer, area);
}

/// Compute x-axis bounds from data points.
fn x_bounds(data1: &[(f64, f64)], data2: &[(f64, f64)], starting_epoch: usize) -> (f64, f64) {
    let firsts = data1.first().into_iter().chain(data2.first()).map(|d| d.0);
    let lasts = data1.last().into_iter().chain(data2.last()).map(|d| d.0);

    let x_min = firsts.reduce(f64::min).unwrap_or(starting_epoch as f64);
    let x_max = lasts.reduce(f64::max).unwrap_or(x_min + 1.0);

    (x_min, x_max.max(x_min + 1.0))
}

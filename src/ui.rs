use std::time::Duration;

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Flex, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    symbols::border,
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Gauge, Paragraph, Row, Table, TableState, Tabs, Wrap},
};

use crate::domain::AppConfig;
use crate::model::{Model, Tab, TableData, UIData};
use crate::workspace::WorkspaceState;

const STATUS_MESSAGE_TIMEOUT: Duration = Duration::from_secs(5);

pub struct TableUI {
    table_state: TableState,
}

impl TableUI {
    pub fn new(_cfg: &AppConfig) -> Self {
        Self {
            table_state: TableState::default(),
        }
    }

    pub fn draw(&mut self, model: &Model, frame: &mut Frame) {
        let uidata = model.uidata();
        let full = frame.area();
        let [header, tabs, body, footer] = Layout::vertical([
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Fill(1),
            Constraint::Length(1),
        ])
        .areas(full);

        Self::render_header(frame, &uidata, header);
        Self::render_tabs(frame, &uidata, tabs);
        match &uidata.table {
            Some(table) => self.render_table(frame, &uidata.title, table, body),
            None => Self::render_workspace(frame, &uidata.workspace, body),
        }
        Self::render_status(frame, &uidata, footer);

        if let Some(details) = uidata.table.as_ref().and_then(|t| t.drawer.as_ref()) {
            Self::render_drawer(frame, details, body);
        }
        if uidata.show_popup {
            Self::render_popup(frame, &uidata.popup_message, full);
        }
    }

    fn render_header(frame: &mut Frame, uidata: &UIData, area: Rect) {
        let second = match (&uidata.profile_error, &uidata.trainer) {
            (Some(err), _) => Line::from(err.as_str().red()),
            (None, Some(trainer)) => Line::from(vec!["Trainer: ".into(), trainer.as_str().cyan()]),
            (None, None) => Line::from("No trainer assigned".dark_gray()),
        };
        let text = Text::from(vec![Line::from(uidata.greeting.as_str().bold()), second]);
        let block = Block::default()
            .borders(Borders::BOTTOM)
            .border_set(border::PLAIN);
        frame.render_widget(Paragraph::new(text).block(block), area);
    }

    fn render_tabs(frame: &mut Frame, uidata: &UIData, area: Rect) {
        let titles = Tab::ALL.iter().map(|t| t.title()).collect::<Vec<_>>();
        let selected = Tab::ALL.iter().position(|t| *t == uidata.tab).unwrap_or(0);
        let tabs = Tabs::new(titles)
            .select(selected)
            .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));
        frame.render_widget(tabs, area);
    }

    fn render_table(&mut self, frame: &mut Frame, title: &str, data: &TableData, area: Rect) {
        let [query, table_area, pager] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Fill(1),
            Constraint::Length(1),
        ])
        .areas(area);

        let mut spans: Vec<Span> = vec!["Search: ".dark_gray()];
        if data.search_text.is_empty() {
            spans.push("-".into());
        } else {
            spans.push(data.search_text.as_str().yellow());
        }
        for (name, value) in &data.filters {
            spans.push(format!("  {name}: ").dark_gray());
            spans.push(Span::raw(*value));
        }
        spans.push("  Sort: ".dark_gray());
        spans.push(Span::raw(data.sort_key));
        frame.render_widget(Paragraph::new(Line::from(spans)), query);

        let header = Row::new(data.headers.iter().copied())
            .style(Style::default().add_modifier(Modifier::BOLD | Modifier::UNDERLINED));
        let rows = data.rows.iter().map(|cells| Row::new(cells.iter().cloned()));
        let widths = data.headers.iter().map(|_| Constraint::Fill(1));
        let table = Table::new(rows, widths)
            .header(header)
            .block(Block::bordered().title(Line::from(format!(" {title} ").bold())))
            .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED));

        if data.rows.is_empty() {
            self.table_state.select(None);
        } else {
            self.table_state.select(Some(data.selected_row));
        }
        frame.render_stateful_widget(table, table_area, &mut self.table_state);

        let pages = Line::from(vec![
            format!(" Page {} of {}", data.page, data.page_count).bold(),
            format!(
                "  ({} of {} records match)",
                data.total_matching, data.total_records
            )
            .dark_gray(),
        ]);
        frame.render_widget(Paragraph::new(pages), pager);
    }

    fn render_workspace(frame: &mut Frame, state: &WorkspaceState, area: Rect) {
        let block = Block::bordered()
            .title(Line::from(" Workspace ".bold()))
            .border_set(border::ROUNDED);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let [text_area, gauge_area] =
            Layout::vertical([Constraint::Length(3), Constraint::Length(1)]).areas(inner);

        let (text, progress) = match state {
            WorkspaceState::Inactive => (
                Text::from(vec![
                    Line::from("Your development workspace is not running."),
                    Line::from(vec!["Press ".into(), "<Enter>".blue().bold(), " to launch it.".into()]),
                ]),
                None,
            ),
            WorkspaceState::Provisioning { progress } => (
                Text::from(vec![
                    Line::from("Provisioning workspace ...".yellow()),
                    Line::from(vec!["Press ".into(), "<x>".blue().bold(), " to cancel.".into()]),
                ]),
                Some(*progress),
            ),
            WorkspaceState::Ready { url } => (
                Text::from(vec![
                    Line::from("Workspace is ready".green().bold()),
                    Line::from(vec!["Open ".into(), url.as_str().underlined()]),
                    Line::from(vec!["Press ".into(), "<y>".blue().bold(), " to copy the url.".into()]),
                ]),
                Some(100),
            ),
            WorkspaceState::Error { message } => (
                Text::from(vec![
                    Line::from(message.as_str().red().bold()),
                    Line::from(vec!["Press ".into(), "<Enter>".blue().bold(), " to try again.".into()]),
                ]),
                None,
            ),
        };
        frame.render_widget(Paragraph::new(text).wrap(Wrap { trim: true }), text_area);

        if let Some(progress) = progress {
            let gauge = Gauge::default()
                .gauge_style(Style::default().fg(Color::Cyan).bg(Color::Black))
                .percent(u16::from(progress))
                .label(format!("{progress}%"));
            frame.render_widget(gauge, gauge_area);
        }
    }

    fn render_drawer(frame: &mut Frame, details: &[(&'static str, String)], area: Rect) {
        let [_, drawer] =
            Layout::horizontal([Constraint::Percentage(55), Constraint::Percentage(45)])
                .areas(area);
        let width = details.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
        let lines = details
            .iter()
            .map(|(label, value)| {
                Line::from(vec![
                    format!("{label:<width$}  ").dark_gray(),
                    Span::raw(value.as_str()),
                ])
            })
            .collect::<Vec<_>>();

        let block = Block::bordered()
            .title(Line::from(" Details ".bold()))
            .title_bottom(Line::from(" <Esc> close ").right_aligned())
            .border_set(border::THICK);
        frame.render_widget(Clear, drawer);
        frame.render_widget(
            Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
            drawer,
        );
    }

    fn render_popup(frame: &mut Frame, message: &str, area: Rect) {
        let popup = centered_rect(area, 60, 80);
        let block = Block::bordered()
            .title(Line::from(" Help ".bold()).centered())
            .title_bottom(Line::from(" <Esc> close ").centered())
            .border_set(border::DOUBLE);
        frame.render_widget(Clear, popup);
        frame.render_widget(
            Paragraph::new(message).block(block).alignment(Alignment::Left),
            popup,
        );
    }

    fn render_status(frame: &mut Frame, uidata: &UIData, area: Rect) {
        if uidata.active_cmdinput {
            let input = &uidata.cmdinput;
            let line = Line::from(vec!["/".yellow().bold(), Span::raw(input.input.as_str())]);
            frame.render_widget(Paragraph::new(line), area);
            frame.set_cursor_position((input_cursor_x(area, input.curser_pos), area.y));
            return;
        }

        let line = if uidata.last_status_message_update.elapsed() < STATUS_MESSAGE_TIMEOUT {
            Line::from(uidata.status_message.as_str())
        } else {
            Line::from(vec![
                "<?>".blue().bold(),
                " help ".into(),
                "<Tab>".blue().bold(),
                " switch ".into(),
                "<q>".blue().bold(),
                " quit".into(),
            ])
        };
        frame.render_widget(Paragraph::new(line), area);
    }
}

// Column of the search cursor, after the leading '/'
fn input_cursor_x(area: Rect, curser_pos: usize) -> u16 {
    let offset = u16::try_from(curser_pos).unwrap_or(u16::MAX);
    area.x.saturating_add(1).saturating_add(offset)
}

fn centered_rect(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let [area] = Layout::vertical([Constraint::Percentage(percent_y)])
        .flex(Flex::Center)
        .areas(area);
    let [area] = Layout::horizontal([Constraint::Percentage(percent_x)])
        .flex(Flex::Center)
        .areas(area);
    area
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::DemoBackend;
    use crate::domain::Message;
    use crate::roster::{demo_students, demo_submissions};
    use ratatui::{Terminal, backend::TestBackend};

    fn render(model: &Model) -> String {
        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
        let mut ui = TableUI::new(&AppConfig::default());
        terminal.draw(|f| ui.draw(model, f)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    fn model() -> Model {
        Model::init(
            &AppConfig::default(),
            demo_students(),
            demo_submissions(),
            Box::new(DemoBackend),
            Tab::Students,
        )
        .unwrap()
    }

    #[test]
    fn renders_greeting_table_and_pager() {
        let screen = render(&model());
        assert!(screen.contains("Welcome back, Demo Student!"));
        assert!(screen.contains("Arjun Kumar"));
        assert!(screen.contains("Page 1 of 1"));
    }

    #[test]
    fn renders_drawer_and_workspace() {
        let mut model = model();
        model.update(Some(Message::Enter)).unwrap();
        let screen = render(&model);
        assert!(screen.contains("Details"));
        assert!(screen.contains("arjun@example.com"));

        model.update(Some(Message::Exit)).unwrap();
        model.update(Some(Message::NextTab)).unwrap();
        model.update(Some(Message::NextTab)).unwrap();
        let screen = render(&model);
        assert!(screen.contains("not running"));
    }

    #[test]
    fn input_cursor_never_overflows() {
        let area = Rect::new(4, 29, 100, 1);
        assert_eq!(input_cursor_x(area, 0), 5);
        assert_eq!(input_cursor_x(area, 3), 8);
        assert_eq!(input_cursor_x(area, 70_000), u16::MAX);
        assert_eq!(input_cursor_x(area, usize::MAX), u16::MAX);
    }

    #[test]
    fn centered_rect_is_inside_area() {
        let area = Rect::new(0, 0, 100, 50);
        let popup = centered_rect(area, 60, 80);
        assert_eq!(popup.width, 60);
        assert_eq!(popup.height, 40);
        assert_eq!(popup.x, 20);
        assert_eq!(popup.y, 5);
    }
}

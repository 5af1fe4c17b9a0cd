use iced::widget::{button, column, container, image, row, text, Space};
use iced::{Alignment, Color, Element, Length, Padding, Theme};

use memoir_gallery::loading::LoadState;
use memoir_gallery::state::Photo;
use memoir_gallery::viewer::ViewerController;

use crate::Message;

/// Dimmed layer between the grid and the viewer
pub fn backdrop<'a>() -> Element<'a, Message> {
    container(Space::new(Length::Fill, Length::Fill))
        .width(Length::Fill)
        .height(Length::Fill)
        .style(|_theme: &Theme| container::Style {
            background: Some(Color::from_rgba(0.05, 0.05, 0.07, 0.6).into()),
            ..container::Style::default()
        })
        .into()
}

/// The floating viewer, placed at the controller's position.
///
/// The header row is exactly the drag handle strip the controller hit-tests,
/// so dragging and the on-screen handle stay in agreement.
pub fn floating_viewer<'a>(
    photo: &'a Photo,
    viewer: &ViewerController,
    load: Option<&'a LoadState>,
    count: usize,
) -> Element<'a, Message> {
    let size = viewer.panel_size();
    let position = viewer.position();
    let index = viewer.current_index();

    let header = row![
        column![
            text(&photo.title).size(20),
            text(photo.display_date()).size(13),
        ]
        .spacing(2)
        .width(Length::Fill),
        button(text(if viewer.liked() { "♥" } else { "♡" }).size(18))
            .style(button::text)
            .on_press(Message::ToggleLike),
        button(text("⤓").size(18))
            .style(button::text)
            .on_press(Message::Download),
        button(text("✕").size(18))
            .style(button::text)
            .on_press(Message::Close),
    ]
    .spacing(8)
    .padding([8, 16])
    .align_y(Alignment::Center)
    .height(viewer.handle_rect().height);

    let navigation = row![
        button(text("‹ Previous").size(14))
            .style(button::secondary)
            .on_press_maybe((index > 0).then_some(Message::Previous)),
        Space::with_width(Length::Fill),
        text(format!("{} / {}", index + 1, count)).size(13),
        Space::with_width(Length::Fill),
        button(text("Next ›").size(14))
            .style(button::secondary)
            .on_press_maybe((index + 1 < count).then_some(Message::Next)),
    ]
    .align_y(Alignment::Center);

    let details = column![
        navigation,
        text(format!("\u{201c}{}\u{201d}", photo.caption)).size(15),
        text(format!("{} · {}", photo.season, photo.tag)).size(12),
    ]
    .spacing(10)
    .padding([0, 16]);

    let body = column![header, picture(load), details]
        .spacing(10)
        .height(Length::Fill)
        .padding(Padding {
            top: 0.0,
            right: 0.0,
            bottom: 16.0,
            left: 0.0,
        });

    let panel = container(body)
        .width(size.width)
        .height(size.height)
        .style(container::rounded_box);

    container(panel)
        .padding(Padding {
            top: position.y,
            right: 0.0,
            bottom: 0.0,
            left: position.x,
        })
        .width(Length::Fill)
        .height(Length::Fill)
        .into()
}

/// The image for the current stage, with progress while loading
fn picture<'a>(load: Option<&'a LoadState>) -> Element<'a, Message> {
    let Some(state) = load else {
        return centered(text("Preparing…").size(14));
    };

    let shown = image(image::Handle::from_path(&state.current.src))
        .width(Length::Fill)
        .height(Length::Fill);

    if state.is_error() {
        column![shown, text("This photo could not be loaded").size(13)]
            .align_x(Alignment::Center)
            .height(Length::Fill)
            .into()
    } else if state.is_loading() {
        column![shown, text(format!("Loading {}%", state.progress)).size(12)]
            .align_x(Alignment::Center)
            .height(Length::Fill)
            .into()
    } else {
        shown.into()
    }
}

fn centered<'a>(content: impl Into<Element<'a, Message>>) -> Element<'a, Message> {
    container(content)
        .center_x(Length::Fill)
        .center_y(Length::Fill)
        .into()
}

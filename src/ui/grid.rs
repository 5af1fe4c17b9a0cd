use iced::widget::{button, column, container, image, row, text, Space};
use iced::{Alignment, ContentFit, Element, Length};
use iced_aw::Wrap;
use std::path::Path;

use memoir_gallery::state::{Photo, SortOrder};

use crate::Message;

pub const PAGE_PADDING: f32 = 24.0;
pub const SECTION_SPACING: f32 = 24.0;

const TOOLBAR_HEIGHT: f32 = 48.0;
const GRID_SPACING: f32 = 16.0;
const CARD_WIDTH: f32 = 240.0;
const CARD_PADDING: f32 = 8.0;
const THUMBNAIL_HEIGHT: f32 = 180.0;
/// Title, season line and the spacing between them
const CARD_TEXT_HEIGHT: f32 = 56.0;

/// Title, sort toggle and status line
pub fn toolbar<'a>(sort: SortOrder, status: &'a str) -> Element<'a, Message> {
    let sort_button = |order: SortOrder| {
        let style = if order == sort { button::primary } else { button::secondary };
        button(text(order.label()).size(14))
            .style(style)
            .padding([6, 14])
            .on_press(Message::SortBy(order))
    };

    row![
        text("Memoir Gallery").size(32),
        Space::with_width(Length::Fill),
        text(status).size(14),
        sort_button(SortOrder::Date),
        sort_button(SortOrder::Season),
    ]
    .spacing(12)
    .align_y(Alignment::Center)
    .into()
}

/// Thumbnail grid. Cards only react to clicks while `interactive` is set,
/// so presses on the backdrop of an open viewer never reach them.
pub fn photo_grid<'a>(photos: &'a [Photo], image_root: &Path, interactive: bool) -> Element<'a, Message> {
    let cards: Vec<Element<'a, Message>> = photos
        .iter()
        .enumerate()
        .map(|(index, photo)| photo_card(photo, index, image_root, interactive))
        .collect();

    Wrap::with_elements(cards)
        .spacing(GRID_SPACING)
        .line_spacing(GRID_SPACING)
        .into()
}

fn photo_card<'a>(photo: &'a Photo, index: usize, image_root: &Path, interactive: bool) -> Element<'a, Message> {
    let thumbnail = image(image::Handle::from_path(
        image_root.join(photo.thumbnail.trim_start_matches('/')),
    ))
    .width(CARD_WIDTH)
    .height(THUMBNAIL_HEIGHT)
    .content_fit(ContentFit::Cover);

    let body = column![
        thumbnail,
        text(&photo.title).size(16),
        text(format!("{} · {}", photo.season, photo.tag)).size(12),
    ]
    .spacing(6)
    .width(CARD_WIDTH);

    button(body)
        .style(button::text)
        .padding(CARD_PADDING)
        .on_press_maybe(interactive.then_some(Message::Open(index)))
        .into()
}

/// Estimated height of the whole page for `count` photos in a window of the
/// given width, following the wrap layout of `photo_grid`.
pub fn content_height(count: usize, window_width: f32, footer_height: f32) -> f32 {
    let card_width = CARD_WIDTH + 2.0 * CARD_PADDING;
    let card_height = THUMBNAIL_HEIGHT + CARD_TEXT_HEIGHT + 2.0 * CARD_PADDING;

    let usable = (window_width - 2.0 * PAGE_PADDING).max(card_width);
    let per_row = (((usable + GRID_SPACING) / (card_width + GRID_SPACING)).floor() as usize).max(1);
    let rows = count.div_ceil(per_row);
    let grid = if rows == 0 {
        0.0
    } else {
        rows as f32 * card_height + (rows - 1) as f32 * GRID_SPACING
    };

    2.0 * PAGE_PADDING + TOOLBAR_HEIGHT + grid + footer_height + 2.0 * SECTION_SPACING
}

/// Bottom band of the page, used as the near-view anchor for prefetching
pub fn footer<'a>(height: f32) -> Element<'a, Message> {
    container(text("Made with care · Memoir Gallery").size(12))
        .width(Length::Fill)
        .height(height)
        .center_x(Length::Fill)
        .center_y(height)
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_height_empty() {
        assert_eq!(content_height(0, 1280.0, 80.0), 224.0);
    }

    #[test]
    fn test_content_height_wraps_by_width() {
        // Four cards fit across 1280px, so three photos take one row
        assert_eq!(content_height(3, 1280.0, 80.0), content_height(4, 1280.0, 80.0));
        assert!(content_height(3, 1280.0, 80.0) < 800.0);
        assert!(content_height(5, 1280.0, 80.0) > content_height(4, 1280.0, 80.0));

        // A narrow window still fits one card per row
        let one = content_height(1, 100.0, 80.0);
        assert_eq!(content_height(3, 100.0, 80.0), one + 2.0 * (252.0 + GRID_SPACING));
    }
}

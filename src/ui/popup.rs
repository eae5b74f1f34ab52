use bevy::prelude::*;
use bevy::window::PrimaryWindow;

use crate::edit::Brush;
use crate::tiles::{Atlas, TileId, TileProperties, TileRegistry};

/// Height of the draggable title bar
pub const POPUP_TITLE_HEIGHT: f32 = 24.0;
const POPUP_WIDTH: f32 = 236.0;
const POPUP_BORDER: f32 = 2.0;
const PALETTE_PADDING: f32 = 6.0;
const PALETTE_GAP: f32 = 6.0;
const BUTTON_SIZE: f32 = 40.0;

const BRUSH_IDLE: Color = Color::srgb(0.2, 0.2, 0.3);
const BRUSH_SELECTED: Color = Color::srgb(0.35, 0.35, 0.6);

/// Position and drag state of the tile palette window, in window pixels
#[derive(Resource, Debug, Clone, PartialEq)]
pub struct PopupState {
    pub visible: bool,
    /// Top-left corner
    pub position: Vec2,
    pub size: Vec2,
    /// Cursor offset from `position` while dragging
    drag_offset: Option<Vec2>,
}

impl Default for PopupState {
    fn default() -> Self {
        Self::for_tiles(TileProperties::defaults().len())
    }
}

impl PopupState {
    /// Popup tall enough to hold one brush button per tile kind
    pub fn for_tiles(count: usize) -> Self {
        let rows = count.div_ceil(buttons_per_row()).max(1) as f32;
        let palette = rows * BUTTON_SIZE + (rows - 1.0) * PALETTE_GAP + 2.0 * PALETTE_PADDING;
        Self {
            visible: true,
            position: Vec2::new(20.0, 80.0),
            size: Vec2::new(POPUP_WIDTH, 2.0 * POPUP_BORDER + POPUP_TITLE_HEIGHT + palette),
            drag_offset: None,
        }
    }

    /// Window-space rect of the brush button at `index`, laid out as the palette wraps them
    pub fn button_rect(&self, index: usize) -> Rect {
        let per_row = buttons_per_row();
        let cell = BUTTON_SIZE + PALETTE_GAP;
        let offset = Vec2::new(
            POPUP_BORDER + PALETTE_PADDING + (index % per_row) as f32 * cell,
            POPUP_BORDER + POPUP_TITLE_HEIGHT + PALETTE_PADDING + (index / per_row) as f32 * cell,
        );
        let min = self.position + offset;
        Rect::from_corners(min, min + Vec2::splat(BUTTON_SIZE))
    }

    pub fn rect(&self) -> Rect {
        Rect::from_corners(self.position, self.position + self.size)
    }

    pub fn title_bar_rect(&self) -> Rect {
        Rect::from_corners(
            self.position,
            self.position + Vec2::new(self.size.x, POPUP_TITLE_HEIGHT),
        )
    }

    /// True when the popup is shown and covers the point
    pub fn contains(&self, point: Vec2) -> bool {
        self.visible && self.rect().contains(point)
    }

    pub fn title_bar_contains(&self, point: Vec2) -> bool {
        self.visible && self.title_bar_rect().contains(point)
    }

    pub fn is_dragging(&self) -> bool {
        self.drag_offset.is_some()
    }

    pub fn toggle(&mut self) {
        self.visible = !self.visible;
        self.drag_offset = None;
    }

    /// Advance the drag from this frame's mouse state. A press on the title bar
    /// starts a drag, holding moves the popup (kept inside the window), release ends it.
    /// Returns true if the popup moved.
    pub fn update_drag(
        &mut self,
        cursor: Option<Vec2>,
        mouse_down: bool,
        pressed_this_frame: bool,
        window_size: Vec2,
    ) -> bool {
        if !self.visible || !mouse_down {
            self.drag_offset = None;
            return false;
        }

        if pressed_this_frame {
            self.drag_offset = cursor
                .filter(|c| self.title_bar_contains(*c))
                .map(|c| c - self.position);
        }

        let (Some(offset), Some(cursor)) = (self.drag_offset, cursor) else {
            return false;
        };
        let max = (window_size - self.size).max(Vec2::ZERO);
        let position = (cursor - offset).clamp(Vec2::ZERO, max);
        let moved = position != self.position;
        self.position = position;
        moved
    }
}

fn buttons_per_row() -> usize {
    let inner = POPUP_WIDTH - 2.0 * (POPUP_BORDER + PALETTE_PADDING);
    (((inner + PALETTE_GAP) / (BUTTON_SIZE + PALETTE_GAP)) as usize).max(1)
}

/// True when the cursor is over an interactive overlay
pub fn is_pointer_over_ui(popup: &PopupState, cursor: Vec2) -> bool {
    popup.contains(cursor)
}

#[derive(Component)]
pub struct PopupRoot;

#[derive(Component)]
pub struct BrushButton(pub TileId);

/// Spawn the palette window: a title bar with a close button and one button per tile kind
pub fn spawn_popup(commands: &mut Commands, popup: &PopupState, registry: &TileRegistry, atlas: &Atlas) {
    commands
        .spawn((
            PopupRoot,
            Node {
                position_type: PositionType::Absolute,
                left: Val::Px(popup.position.x),
                top: Val::Px(popup.position.y),
                width: Val::Px(popup.size.x),
                height: Val::Px(popup.size.y),
                flex_direction: FlexDirection::Column,
                border: UiRect::all(Val::Px(POPUP_BORDER)),
                ..default()
            },
            BackgroundColor(Color::srgba(0.1, 0.1, 0.15, 0.9)),
            BorderColor::all(Color::srgb(0.4, 0.4, 0.6)),
            BorderRadius::all(Val::Px(4.0)),
        ))
        .with_children(|window| {
            // Title bar
            window
                .spawn((
                    Node {
                        height: Val::Px(POPUP_TITLE_HEIGHT),
                        justify_content: JustifyContent::SpaceBetween,
                        align_items: AlignItems::Center,
                        padding: UiRect::horizontal(Val::Px(6.0)),
                        ..default()
                    },
                    BackgroundColor(Color::srgb(0.25, 0.25, 0.4)),
                ))
                .with_children(|bar| {
                    bar.spawn((
                        Text::new("Tiles"),
                        TextFont {
                            font_size: 14.0,
                            ..default()
                        },
                        TextColor(Color::WHITE),
                    ));
                    bar.spawn((
                        Button,
                        Node {
                            width: Val::Px(18.0),
                            height: Val::Px(18.0),
                            justify_content: JustifyContent::Center,
                            align_items: AlignItems::Center,
                            ..default()
                        },
                        BackgroundColor(Color::srgb(0.5, 0.2, 0.2)),
                        BorderRadius::all(Val::Px(3.0)),
                    ))
                    .observe(close_popup)
                    .with_children(|button| {
                        button.spawn((
                            Text::new("x"),
                            TextFont {
                                font_size: 12.0,
                                ..default()
                            },
                            TextColor(Color::WHITE),
                        ));
                    });
                });

            // Tile palette
            window
                .spawn(Node {
                    flex_direction: FlexDirection::Row,
                    flex_wrap: FlexWrap::Wrap,
                    column_gap: Val::Px(PALETTE_GAP),
                    row_gap: Val::Px(PALETTE_GAP),
                    padding: UiRect::all(Val::Px(PALETTE_PADDING)),
                    ..default()
                })
                .with_children(|palette| {
                    for (id, props) in registry.iter() {
                        palette
                            .spawn((
                                Button,
                                BrushButton(id),
                                Node {
                                    width: Val::Px(BUTTON_SIZE),
                                    height: Val::Px(BUTTON_SIZE),
                                    justify_content: JustifyContent::Center,
                                    align_items: AlignItems::Center,
                                    border: UiRect::all(Val::Px(2.0)),
                                    ..default()
                                },
                                BackgroundColor(BRUSH_IDLE),
                                BorderColor::all(Color::srgb(0.4, 0.4, 0.6)),
                                BorderRadius::all(Val::Px(4.0)),
                            ))
                            .observe(move |_click: On<Pointer<Click>>, mut brush: ResMut<Brush>| {
                                brush.0 = id;
                            })
                            .with_children(|button| {
                                button.spawn((
                                    ImageNode {
                                        image: atlas.texture().clone(),
                                        rect: atlas.rect(id as u32).map(|r| r.as_rect()),
                                        ..default()
                                    },
                                    Node {
                                        width: Val::Px(BUTTON_SIZE - 8.0),
                                        height: Val::Px(BUTTON_SIZE - 8.0),
                                        ..default()
                                    },
                                ));
                            });
                        debug!("Palette button for tile {} ({})", id, props.name);
                    }
                });
        });
}

fn close_popup(_click: On<Pointer<Click>>, mut popup: ResMut<PopupState>) {
    popup.visible = false;
}

/// Drag the popup by its title bar
pub fn drag_popup(
    mouse: Res<ButtonInput<MouseButton>>,
    window_query: Query<&Window, With<PrimaryWindow>>,
    mut popup: ResMut<PopupState>,
) {
    let Ok(window) = window_query.single() else {
        return;
    };
    let down = mouse.pressed(MouseButton::Left);
    // Only touch the resource when something can change, so change detection stays quiet
    if !down && !popup.is_dragging() {
        return;
    }
    popup.update_drag(
        window.cursor_position(),
        down,
        mouse.just_pressed(MouseButton::Left),
        window.size(),
    );
}

/// Mirror PopupState onto the UI node
pub fn sync_popup_node(popup: Res<PopupState>, mut query: Query<&mut Node, With<PopupRoot>>) {
    if !popup.is_changed() {
        return;
    }
    for mut node in &mut query {
        node.left = Val::Px(popup.position.x);
        node.top = Val::Px(popup.position.y);
        node.display = if popup.visible {
            Display::Flex
        } else {
            Display::None
        };
    }
}

/// Highlight the selected brush
pub fn highlight_brush(brush: Res<Brush>, mut buttons: Query<(&BrushButton, &mut BackgroundColor)>) {
    if !brush.is_changed() {
        return;
    }
    for (button, mut color) in &mut buttons {
        *color = BackgroundColor(if button.0 == brush.0 {
            BRUSH_SELECTED
        } else {
            BRUSH_IDLE
        });
    }
}

const DEFAULT_ROOM: &str = "living-room";

const DEMO_IMAGES: &[(&str, &str)] = &[
    (
        "living-room",
        "https://images.unsplash.com/photo-1586023492125-27b2c045efd7?w=1024&q=90",
    ),
    (
        "bedroom",
        "https://images.unsplash.com/photo-1616594039964-ae9021a400a0?w=1024&q=90",
    ),
    (
        "kitchen",
        "https://images.unsplash.com/photo-1556909114-f6e7ad7d3136?w=1024&q=90",
    ),
    (
        "bathroom",
        "https://images.unsplash.com/photo-1552321554-5fefe8c9ef14?w=1024&q=90",
    ),
    (
        "office",
        "https://images.unsplash.com/photo-1524758631624-e2822e304c36?w=1024&q=90",
    ),
    (
        "dining",
        "https://images.unsplash.com/photo-1617806118233-18e1de247200?w=1024&q=90",
    ),
];

/// Canned staged photo for a room type; unknown rooms get the living room.
pub fn demo_image(room_type_id: &str) -> &'static str {
    DEMO_IMAGES
        .iter()
        .find(|(id, _)| *id == room_type_id)
        .or_else(|| DEMO_IMAGES.iter().find(|(id, _)| *id == DEFAULT_ROOM))
        .map(|(_, url)| *url)
        .unwrap_or(DEMO_IMAGES[0].1)
}

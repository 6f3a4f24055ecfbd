//! End-to-end scenarios over the pure pipeline
use placer_core::prelude::*;
use placer_core::raster::Channel;

fn palette_rgba(index: usize) -> [u8; 4] {
    let [r, g, b] = PALETTE[index].rgb();
    [r, g, b, 255]
}

#[test]
fn opaque_template_with_two_colors() {
    let template = Raster::from_fn(2, 2, |x, y| match (x, y) {
        (0, 0) | (1, 0) => palette_rgba(0),
        _ => palette_rgba(1),
    });
    let canvas = Raster::filled(2, 2, palette_rgba(0));

    let work = diff(&template, &canvas).unwrap();

    assert_eq!(work.layer_count(), 1);
    let layer = work.layer(0).unwrap();
    let coords: Vec<_> = layer.iter().map(|c| (c.x, c.y, c.color_index)).collect();
    assert_eq!(coords, vec![(0, 1, 1), (1, 1, 1)]);
}

#[test]
fn fully_transparent_template_is_complete() {
    let template = Raster::filled(2, 2, [0, 0, 0, 0]);
    let canvas = Raster::filled(2, 2, palette_rgba(31));

    let work = diff(&template, &canvas).unwrap();
    assert_eq!(work.layer_count(), 0);
    assert!(work.is_complete());
    assert!(Sampler::default().pick(&work, 0.1).is_err());
}

#[test]
fn four_tiles_assemble_into_quadrants() {
    let black = palette_rgba(27);
    let tiles: Vec<_> = [(0, 0), (2, 0), (0, 2), (2, 2)]
        .into_iter()
        .map(|(ox, oy)| PlacedTile::new(Raster::filled(2, 2, black), ox, oy))
        .collect();

    let canvas = assemble(&tiles).unwrap();

    assert_eq!((canvas.width(), canvas.height()), (4, 4));
    for y in 0..4 {
        for x in 0..4 {
            assert_eq!(canvas.pixel(x, y), black, "pixel ({x}, {y})");
        }
    }
    // quadrant boundaries
    for &(x, y) in &[(1, 1), (2, 1), (1, 2), (2, 2), (3, 0), (0, 3)] {
        assert_eq!(canvas.channel(x, y, Channel::A), 255);
    }
}

#[test]
fn distinct_tiles_map_back_to_their_source() {
    let tiles: Vec<_> = [(0u8, 0, 0), (1, 2, 0), (2, 0, 2), (3, 2, 2)]
        .into_iter()
        .map(|(id, ox, oy)| {
            let raster = Raster::from_fn(2, 2, |x, y| [id, x as u8, y as u8, 255]);
            PlacedTile::new(raster, ox, oy)
        })
        .collect();

    let canvas = assemble(&tiles).unwrap();
    let layout = TileLayout::grid(2, 2, 2, 2);

    for y in 0..4 {
        for x in 0..4 {
            let address = layout.locate(x, y).unwrap();
            let tile = &tiles[address.canvas_index as usize];
            assert_eq!(canvas.pixel(x, y), tile.raster.pixel(address.x, address.y));
        }
    }
}

#[test]
fn submission_address_for_reference_layout() {
    let address = TileLayout::reference().locate(1500, 250).unwrap();
    assert_eq!(address.canvas_index, 1);
    assert_eq!((address.x, address.y), (500, 250));
}

#[test]
fn staged_template_prefers_opaque_layer() {
    // left column opaque, right column at alpha 254 (layer 1)
    let template = Raster::from_fn(2, 4, |x, _| {
        let [r, g, b, _] = palette_rgba(2);
        [r, g, b, if x == 0 { 255 } else { 254 }]
    });
    let canvas = Raster::filled(2, 4, palette_rgba(31));
    let work = diff(&template, &canvas).unwrap();
    assert_eq!(work.summary(), vec![(0, 4), (1, 4)]);

    let sampler = Sampler::default();
    let steps = 1000u32;
    let opaque = (0..steps)
        .filter(|&i| sampler.pick(&work, f64::from(i) / f64::from(steps)).unwrap().x == 0)
        .count();
    assert!(opaque.abs_diff(800) <= 1, "opaque picks: {opaque}");
}

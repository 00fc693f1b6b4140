// src/bin/glint-trace.rs — paint a sample widget tree headlessly and log what
// the GPU would have been asked to do.
//
// Reads renderer settings from $GLINT_CONFIG if set. Pass a scale factor as
// the first argument to paint the tree at that DPI scale.

use glint::recorder::{GpuCall, RecordingDevice};
use glint::scale::Scalable;
use glint::{
    paint_frame, Batcher, Brush, Color, GradientDirection, LineStyle, PaintNode, PaintResult, Pen,
    Rect, RendererConfig, ShapeStyle, SurfaceId,
};

type Dev = RecordingDevice;

struct Widget {
    bounds: Rect,
    style: ShapeStyle,
    children: Vec<Box<dyn PaintNode<Dev>>>,
    paint_extra: fn(&Widget, &mut Batcher<Dev>) -> PaintResult,
}

impl Widget {
    fn new(bounds: Rect, style: ShapeStyle) -> Self {
        Self {
            bounds,
            style,
            children: Vec::new(),
            paint_extra: |_, _| Ok(()),
        }
    }

    fn with_child(mut self, child: Widget) -> Self {
        self.children.push(Box::new(child));
        self
    }

    fn with_paint(mut self, f: fn(&Widget, &mut Batcher<Dev>) -> PaintResult) -> Self {
        self.paint_extra = f;
        self
    }
}

impl PaintNode<Dev> for Widget {
    fn bounds(&self) -> Rect {
        self.bounds
    }

    fn paint(&self, b: &mut Batcher<Dev>) -> PaintResult {
        b.paint_shape(self.bounds, &self.style);
        (self.paint_extra)(self, b)
    }

    fn children(&self) -> &[Box<dyn PaintNode<Dev>>] {
        &self.children
    }
}

fn sample_tree(scale: f32) -> Widget {
    let mut card = ShapeStyle {
        fill: Some(Brush::LinearGradient {
            start: Color::rgba8(40, 44, 52, 255),
            end: Color::rgba8(24, 26, 31, 255),
            direction: GradientDirection::Vertical,
        }),
        border: Some(Pen::new(Color::rgba8(90, 96, 110, 255))),
        radius: 6.0,
    };
    card.scale(scale);

    let chart = Widget::new(Rect::new(20., 60., 240., 160.), ShapeStyle::default()).with_paint(|w, b| {
        let r = w.bounds;
        let pie = Rect::new(r.x + 10., r.y + 10., 140., 140.);
        b.fill_pie(&Brush::Solid(Color::rgba8(97, 175, 239, 255)), pie, -90.0, 220.0);
        b.fill_pie(&Brush::Solid(Color::rgba8(229, 192, 123, 255)), pie, 130.0, 140.0);
        b.draw_ellipse(&Pen::new(Color::WHITE).with_width(2.0), pie);
        Ok(())
    });

    let legend = Widget::new(Rect::new(280., 60., 200., 160.), card).with_paint(|w, b| {
        let r = w.bounds;
        let dashed = Pen::new(Color::rgba8(152, 195, 121, 255))
            .with_width(2.0)
            .with_style(LineStyle::Dashed);
        b.draw_line(&dashed, [r.x + 10., r.y + 30.], [r.right() - 10., r.y + 30.]);
        b.add_hairline(r.x + 10., r.y + 50., r.right() - 10., r.y + 50., Color::WHITE);
        Ok(())
    });

    // Lies entirely outside its parent and is culled.
    let offscreen = Widget::new(Rect::new(900., 900., 50., 50.), card);

    let broken = Widget::new(Rect::new(20., 240., 100., 30.), card)
        .with_paint(|_, _| Err("sample widget with no data".into()));

    Widget::new(
        Rect::new(0., 0., 640., 360.),
        ShapeStyle {
            fill: Some(Brush::Solid(Color::rgba8(30, 33, 39, 255))),
            ..ShapeStyle::default()
        },
    )
    .with_child(chart)
    .with_child(legend.with_child(offscreen))
    .with_child(broken)
}

fn main() {
    tracing_subscriber::fmt().compact().init();

    let config = RendererConfig::from_env();
    let mut batcher = match Batcher::new(RecordingDevice::new(), config) {
        Ok(b) => b,
        Err(e) => {
            tracing::error!("renderer init failed: {e}");
            std::process::exit(1);
        }
    };

    let scale = std::env::args()
        .nth(1)
        .and_then(|a| a.parse::<f32>().ok())
        .filter(|s| *s > 0.0)
        .unwrap_or(1.0);
    let root = sample_tree(scale);
    batcher.bind_context(SurfaceId(1), 640, 360);
    let summary = paint_frame(&mut batcher, &root);

    let dev = batcher.device();
    for (i, draw) in dev.draws.iter().enumerate() {
        tracing::info!(
            "draw {i}: {:?} texture={:?} vertices={} indices={} scissor={:?}",
            draw.topology,
            draw.texture,
            draw.vertices.len(),
            draw.indices.len(),
            draw.scissor
        );
    }
    let scissors = dev
        .calls
        .iter()
        .filter(|c| matches!(c, GpuCall::Scissor(_)))
        .count();
    tracing::info!("{summary:?} {:?} scissor_calls={scissors}", batcher.stats());
}

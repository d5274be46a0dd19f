//! A simple, high-level debug GUI.
//!
//! [`show_image`] opens one window per key and keeps it updated with the latest frame. The event
//! loop and all GPU resources live on a dedicated thread that is started on first use, so callers
//! can stay a plain blocking loop.

use std::{collections::HashMap, process, sync::Mutex};

use once_cell::sync::Lazy;
use wgpu::{
    Adapter, Backends, BindGroup, BindGroupDescriptor, BindGroupEntry, BindGroupLayout,
    BindGroupLayoutDescriptor, BindGroupLayoutEntry, BindingResource, BindingType, Color,
    CommandEncoderDescriptor, CompositeAlphaMode, Device, DeviceDescriptor, Extent3d, Features,
    Instance, InstanceDescriptor, Limits, LoadOp, Operations, Origin3d, PresentMode, Queue,
    RenderPassColorAttachment, RenderPassDescriptor, RenderPipeline, RenderPipelineDescriptor,
    Sampler, SamplerBindingType, SamplerDescriptor, ShaderModuleDescriptor, ShaderSource,
    ShaderStages, Surface, SurfaceConfiguration, SurfaceError, TextureDescriptor,
    TextureDimension, TextureFormat, TextureSampleType, TextureUsages, TextureViewDimension,
};
use winit::{
    dpi::PhysicalSize,
    event::{Event, WindowEvent},
    event_loop::{ControlFlow, EventLoop, EventLoopBuilder, EventLoopProxy, EventLoopWindowTarget},
    platform::{wayland::EventLoopBuilderExtWayland, x11::EventLoopBuilderExtX11},
    window::{WindowBuilder, WindowId},
};

use crate::{image::Image, resolution::Resolution};

#[derive(Debug)]
enum Msg {
    Image {
        key: String,
        resolution: Resolution,
        data: Vec<u8>,
    },
}

static PROXY: Lazy<Mutex<EventLoopProxy<Msg>>> = Lazy::new(|| {
    let (tx, rx) = std::sync::mpsc::channel();
    std::thread::Builder::new()
        .name("gui".into())
        .spawn(move || {
            let mut builder = EventLoopBuilder::<Msg>::with_user_event();
            // The event loop lives on this thread, not the main thread.
            EventLoopBuilderExtX11::with_any_thread(&mut builder, true);
            EventLoopBuilderExtWayland::with_any_thread(&mut builder, true);
            let event_loop = builder.build();
            tx.send(event_loop.create_proxy()).unwrap();
            run(event_loop);
        })
        .expect("failed to spawn GUI thread");

    Mutex::new(rx.recv().expect("GUI thread failed to start"))
});

/// Displays an image in a window.
///
/// Windows are keyed by `key`: the first call for a key opens a window sized to the image, later
/// calls replace its contents. Closing any window exits the process.
pub fn show_image(key: impl Into<String>, image: &Image) {
    // Image data is RGBA8 internally so that no conversion before GPU upload is needed.
    let msg = Msg::Image {
        key: key.into(),
        resolution: image.resolution(),
        data: image.data().to_vec(),
    };

    PROXY
        .lock()
        .unwrap()
        .send_event(msg)
        .expect("GUI event loop has shut down");
}

fn run(event_loop: EventLoop<Msg>) -> ! {
    let gpu = pollster::block_on(Gpu::open()).expect("failed to open GPU");
    let mut windows: HashMap<String, Renderer> = HashMap::new();
    let mut win_id_to_key: HashMap<WindowId, String> = HashMap::new();

    event_loop.run(move |event, target, flow| {
        *flow = ControlFlow::Wait;
        match event {
            Event::UserEvent(Msg::Image {
                key,
                resolution,
                data,
            }) => {
                let renderer = windows.entry(key.clone()).or_insert_with(|| {
                    log::debug!("creating window for image '{key}' at {resolution}");

                    let renderer = Renderer::open(target, &gpu, &key, resolution).unwrap();
                    win_id_to_key.insert(renderer.window.id(), key.clone());
                    renderer
                });

                renderer.update_texture(&gpu, resolution, &data);
                renderer.window.request_redraw();
            }
            Event::RedrawRequested(window_id) => {
                let key = &win_id_to_key[&window_id];
                windows.get_mut(key).unwrap().redraw(&gpu);
            }
            Event::WindowEvent {
                event: WindowEvent::CloseRequested,
                ..
            } => process::exit(0),
            _ => {}
        }
    });
}

struct Gpu {
    instance: Instance,
    adapter: Adapter,
    device: Device,
    queue: Queue,
}

impl Gpu {
    async fn open() -> anyhow::Result<Self> {
        // The OpenGL backend panics spuriously, so don't enable it.
        let instance = Instance::new(InstanceDescriptor {
            backends: Backends::PRIMARY,
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&Default::default())
            .await
            .ok_or_else(|| anyhow::anyhow!("no graphics adapter found"))?;
        log::debug!("using graphics adapter: {:?}", adapter.get_info());

        let (device, queue) = adapter
            .request_device(
                &DeviceDescriptor {
                    label: None,
                    features: Features::empty(),
                    // Use the texture resolution limits from the adapter, so large camera frames
                    // are supported.
                    limits: Limits::downlevel_defaults().using_resolution(adapter.limits()),
                },
                None,
            )
            .await?;

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
        })
    }
}

struct FrameTexture {
    inner: wgpu::Texture,
    size: Extent3d,
}

impl FrameTexture {
    const FORMAT: TextureFormat = TextureFormat::Rgba8UnormSrgb;

    fn new(gpu: &Gpu, size: Extent3d) -> Self {
        Self {
            inner: gpu.device.create_texture(&TextureDescriptor {
                label: Some("frame"),
                size,
                mip_level_count: 1,
                sample_count: 1,
                dimension: TextureDimension::D2,
                usage: TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST,
                format: Self::FORMAT,
                view_formats: &[],
            }),
            size,
        }
    }

    /// Uploads `data`, reallocating the texture if `size` changed. Returns whether the texture
    /// was reallocated (which invalidates bind groups referencing it).
    fn update(&mut self, gpu: &Gpu, size: Extent3d, data: &[u8]) -> bool {
        assert_eq!((size.width * size.height * 4) as usize, data.len());

        let mut reallocated = false;
        if self.size != size {
            log::trace!(
                "reallocating frame texture ({}x{} -> {}x{})",
                self.size.width,
                self.size.height,
                size.width,
                size.height,
            );
            *self = Self::new(gpu, size);
            reallocated = true;
        }

        gpu.queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &self.inner,
                mip_level: 0,
                origin: Origin3d::default(),
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(size.width * 4),
                rows_per_image: None,
            },
            size,
        );

        reallocated
    }
}

struct Renderer {
    // Surface must be destroyed before `window`.
    surface: Surface,
    surface_format: TextureFormat,
    pipeline: RenderPipeline,
    bind_group_layout: BindGroupLayout,
    bind_group: BindGroup,
    sampler: Sampler,
    texture: FrameTexture,
    resolution: Resolution,
    window: winit::window::Window,
}

impl Renderer {
    fn open(
        target: &EventLoopWindowTarget<Msg>,
        gpu: &Gpu,
        title: &str,
        resolution: Resolution,
    ) -> anyhow::Result<Self> {
        let window = WindowBuilder::new()
            .with_resizable(false)
            .with_inner_size(PhysicalSize::new(resolution.width(), resolution.height()))
            .with_title(title)
            .build(target)?;

        let surface = unsafe { gpu.instance.create_surface(&window)? };
        let surface_format = *surface
            .get_capabilities(&gpu.adapter)
            .formats
            .first()
            .expect("adapter cannot render to window surface");

        let shader = gpu.device.create_shader_module(ShaderModuleDescriptor {
            label: Some("fullscreen texture shader"),
            source: ShaderSource::Wgsl(include_str!("gui/shader.wgsl").into()),
        });

        let bind_group_layout = gpu
            .device
            .create_bind_group_layout(&BindGroupLayoutDescriptor {
                label: None,
                entries: &[
                    BindGroupLayoutEntry {
                        binding: 0,
                        visibility: ShaderStages::FRAGMENT,
                        ty: BindingType::Texture {
                            sample_type: TextureSampleType::Float { filterable: false },
                            view_dimension: TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    BindGroupLayoutEntry {
                        binding: 1,
                        visibility: ShaderStages::FRAGMENT,
                        ty: BindingType::Sampler(SamplerBindingType::NonFiltering),
                        count: None,
                    },
                ],
            });

        let pipeline = gpu
            .device
            .create_render_pipeline(&RenderPipelineDescriptor {
                label: Some("textured_quad"),
                layout: Some(&gpu.device.create_pipeline_layout(
                    &wgpu::PipelineLayoutDescriptor {
                        label: None,
                        bind_group_layouts: &[&bind_group_layout],
                        push_constant_ranges: &[],
                    },
                )),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: "vert",
                    buffers: &[],
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: "frag",
                    targets: &[Some(wgpu::ColorTargetState {
                        format: surface_format,
                        write_mask: wgpu::ColorWrites::ALL,
                        blend: None,
                    })],
                }),
                primitive: wgpu::PrimitiveState::default(),
                depth_stencil: None,
                multisample: Default::default(),
                multiview: None,
            });

        let sampler = gpu.device.create_sampler(&SamplerDescriptor::default());
        let texture = FrameTexture::new(
            gpu,
            Extent3d {
                width: resolution.width(),
                height: resolution.height(),
                depth_or_array_layers: 1,
            },
        );
        let bind_group = Self::create_bind_group(gpu, &bind_group_layout, &texture, &sampler);

        let this = Self {
            surface,
            surface_format,
            pipeline,
            bind_group_layout,
            bind_group,
            sampler,
            texture,
            resolution,
            window,
        };
        this.configure_surface(gpu);
        Ok(this)
    }

    fn create_bind_group(
        gpu: &Gpu,
        layout: &BindGroupLayout,
        texture: &FrameTexture,
        sampler: &Sampler,
    ) -> BindGroup {
        gpu.device.create_bind_group(&BindGroupDescriptor {
            label: None,
            layout,
            entries: &[
                BindGroupEntry {
                    binding: 0,
                    resource: BindingResource::TextureView(
                        &texture.inner.create_view(&Default::default()),
                    ),
                },
                BindGroupEntry {
                    binding: 1,
                    resource: BindingResource::Sampler(sampler),
                },
            ],
        })
    }

    fn configure_surface(&self, gpu: &Gpu) {
        self.surface.configure(
            &gpu.device,
            &SurfaceConfiguration {
                usage: TextureUsages::RENDER_ATTACHMENT,
                format: self.surface_format,
                width: self.resolution.width(),
                height: self.resolution.height(),
                present_mode: PresentMode::Fifo,
                alpha_mode: CompositeAlphaMode::Auto,
                view_formats: Vec::new(),
            },
        );
    }

    fn update_texture(&mut self, gpu: &Gpu, resolution: Resolution, data: &[u8]) {
        let size = Extent3d {
            width: resolution.width(),
            height: resolution.height(),
            depth_or_array_layers: 1,
        };
        if self.texture.update(gpu, size, data) {
            // A reallocated texture invalidates the bind group referencing it.
            self.bind_group =
                Self::create_bind_group(gpu, &self.bind_group_layout, &self.texture, &self.sampler);
        }
    }

    fn redraw(&mut self, gpu: &Gpu) {
        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(err @ (SurfaceError::Outdated | SurfaceError::Lost)) => {
                log::debug!("surface error: {}", err);
                self.configure_surface(gpu);
                self.surface
                    .get_current_texture()
                    .expect("failed to acquire next frame after reconfiguring surface")
            }
            Err(e) => {
                panic!("failed to acquire frame: {}", e);
            }
        };
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = gpu
            .device
            .create_command_encoder(&CommandEncoderDescriptor { label: None });
        {
            let mut rpass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: None,
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Clear(Color::BLACK),
                        store: true,
                    },
                })],
                depth_stencil_attachment: None,
            });

            rpass.set_pipeline(&self.pipeline);
            rpass.set_bind_group(0, &self.bind_group, &[]);
            rpass.draw(0..3, 0..1);
        }

        gpu.queue.submit([encoder.finish()]);
        frame.present();
    }
}

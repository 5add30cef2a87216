use std::sync::mpsc::{self, Receiver};
use std::time::Duration;

use clap::Parser;
use eframe::egui;
use indextree::NodeId;

use bucketscope::format::format_bytes;
use bucketscope::gateway::{FetchEvent, Fetcher, Gateway, DEFAULT_ENDPOINT};
use bucketscope::model::BucketStatus;
use bucketscope::session::{BucketListState, DetailState, Session, View};

#[derive(Parser)]
#[command(name = "bucketscope", version, about = "Browse storage usage across buckets")]
struct Args {
    /// Backend endpoint serving bucket summaries and trees.
    #[arg(long, default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Enable debug logging.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<(), eframe::Error> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let (tx, rx) = mpsc::channel();
    let gateway = Gateway::new(&args.endpoint);
    let endpoint = gateway.base_url().to_string();
    let fetcher = match Fetcher::new(gateway, tx) {
        Ok(fetcher) => fetcher,
        Err(err) => {
            eprintln!("could not start the fetch runtime: {err}");
            std::process::exit(1);
        }
    };

    let app = BucketScopeApp::new(endpoint, fetcher, rx);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1080.0, 720.0])
            .with_title("bucketscope - Bucket Storage Browser"),
        ..Default::default()
    };

    eframe::run_native(
        "bucketscope",
        options,
        Box::new(move |cc| {
            configure_style(&cc.egui_ctx);
            Box::new(app)
        }),
    )
}

fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(level)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("tracing subscriber was already set");
    }
}

fn configure_style(ctx: &egui::Context) {
    let mut style = (*ctx.style()).clone();

    let mut visuals = egui::Visuals::dark();
    visuals.panel_fill = egui::Color32::from_rgb(24, 31, 42);
    visuals.window_fill = egui::Color32::from_rgb(24, 31, 42);
    visuals.widgets.noninteractive.bg_stroke = egui::Stroke::new(
        1.0,
        egui::Color32::from_rgba_unmultiplied(255, 255, 255, 13),
    );
    visuals.widgets.noninteractive.rounding = egui::Rounding::same(6.0);
    visuals.widgets.inactive.rounding = egui::Rounding::same(6.0);
    visuals.widgets.hovered.rounding = egui::Rounding::same(6.0);
    visuals.widgets.active.rounding = egui::Rounding::same(6.0);
    style.visuals = visuals;

    style.spacing.item_spacing = egui::vec2(10.0, 6.0);
    style.spacing.button_padding = egui::vec2(10.0, 5.0);

    ctx.set_style(style);
}

struct BucketScopeApp {
    endpoint: String,
    session: Session,
    fetcher: Fetcher,
    rx: Receiver<FetchEvent>,
}

impl BucketScopeApp {
    fn new(endpoint: String, fetcher: Fetcher, rx: Receiver<FetchEvent>) -> Self {
        // The bucket list is fetched once on entry; views read it shared.
        let mut session = Session::new();
        session.begin_bucket_list();
        fetcher.request_bucket_list();

        Self {
            endpoint,
            session,
            fetcher,
            rx,
        }
    }

    fn poll_fetch_events(&mut self) {
        while let Ok(event) = self.rx.try_recv() {
            self.session.apply(event);
        }
    }

    fn open_bucket(&mut self, bucket_name: &str) {
        let request = self.session.open_bucket(bucket_name);
        self.fetcher.request_bucket_detail(request);
    }

    fn show_home(&self, ui: &mut egui::Ui) {
        ui.add_space(32.0);
        ui.vertical_centered(|ui| match self.session.buckets() {
            BucketListState::Loading => {
                ui.spinner();
                ui.label("Loading buckets...");
            }
            _ if self.session.list_is_empty() => {
                ui.heading("No buckets to show.");
                if let Some(message) = self.session.list_error() {
                    ui.small(message);
                }
            }
            _ => {
                ui.heading("Select a bucket from the list to see its breakdown.");
            }
        });
    }

    fn show_error(&self, ui: &mut egui::Ui) {
        ui.add_space(32.0);
        ui.vertical_centered(|ui| {
            ui.heading(egui::RichText::new("Something went wrong").color(egui::Color32::LIGHT_RED));
            if let DetailState::Failed {
                bucket_name,
                message,
            } = self.session.detail()
            {
                ui.label(format!("Bucket '{}' could not be loaded.", bucket_name));
                ui.small(message);
            }
            ui.add_space(8.0);
            ui.label("Pick another bucket from the list to continue.");
        });
    }

    fn show_bucket(&mut self, ui: &mut egui::Ui) {
        match self.session.detail_mut() {
            DetailState::Loading(request) => {
                ui.add_space(32.0);
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label(format!("Fetching '{}'...", request.bucket_name));
                });
            }
            DetailState::Loaded(loaded) => {
                ui.horizontal(|ui| {
                    ui.heading(&loaded.bucket_name);
                    if loaded.manual {
                        ui.label(egui::RichText::new("✏ manual").italics())
                            .on_hover_text("Data generated by hand");
                    }
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        ui.heading(format_bytes(loaded.total_size()));
                    });
                });
                if !loaded.datetime.is_empty() {
                    ui.weak(format!("Snapshot taken {}", loaded.datetime));
                }
                ui.separator();

                let rows = loaded.rows();
                if rows.is_empty() {
                    ui.label("This bucket has no folders.");
                    return;
                }

                let mut toggled: Option<NodeId> = None;
                egui::ScrollArea::vertical()
                    .auto_shrink([false; 2])
                    .show(ui, |ui| {
                        for row in &rows {
                            ui.horizontal(|ui| {
                                ui.add_space(row.depth as f32 * 18.0);
                                if row.has_children {
                                    let arrow = if row.expanded { "▾" } else { "▸" };
                                    if ui.small_button(arrow).clicked() {
                                        toggled = Some(row.id);
                                    }
                                } else {
                                    ui.add_space(26.0);
                                }
                                let icon = if row.expanded { "📂" } else { "📁" };
                                ui.label(format!("{} {}", icon, row.name));
                                ui.weak(format!("({})", format_bytes(row.size)));
                            });
                        }
                    });

                if let Some(id) = toggled {
                    loaded.toggle(id);
                }
            }
            // A failed detail is shown by the error view; nothing to paint here.
            DetailState::Failed { .. } | DetailState::Idle => {}
        }
    }
}

impl eframe::App for BucketScopeApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_fetch_events();

        let mut selected: Option<String> = None;

        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("bucketscope");
                ui.separator();
                ui.weak(&self.endpoint);
                if self.session.is_fetching() {
                    ui.spinner();
                    ui.label("Fetching...");
                }
            });
        });

        egui::SidePanel::left("bucket_list")
            .default_width(260.0)
            .show(ctx, |ui| {
                ui.add_space(4.0);
                ui.heading("Buckets");
                ui.separator();

                match self.session.buckets() {
                    BucketListState::Loading => {
                        ui.label("Loading...");
                    }
                    BucketListState::Failed(message) => {
                        ui.colored_label(egui::Color32::LIGHT_RED, "Bucket list unavailable");
                        ui.small(message);
                    }
                    BucketListState::Ready(list) if list.is_empty() => {
                        ui.label("No buckets to show.");
                    }
                    BucketListState::Ready(_) => {}
                }

                let current = match self.session.view() {
                    View::Bucket(name) => Some(name.clone()),
                    _ => None,
                };

                egui::ScrollArea::vertical().show(ui, |ui| {
                    for bucket in self.session.bucket_list() {
                        let is_current = current.as_deref() == Some(bucket.bucket_name.as_str());
                        let marker = if bucket.status == BucketStatus::Manual {
                            " ✏"
                        } else {
                            ""
                        };
                        let label = format!(
                            "{}{}  ({})",
                            bucket.bucket_name,
                            marker,
                            format_bytes(bucket.size)
                        );
                        if ui.selectable_label(is_current, label).clicked() {
                            selected = Some(bucket.bucket_name.clone());
                        }
                    }
                });
            });

        egui::CentralPanel::default().show(ctx, |ui| match self.session.view().clone() {
            View::Home => self.show_home(ui),
            View::Error => self.show_error(ui),
            View::Bucket(_) => self.show_bucket(ui),
        });

        if let Some(bucket_name) = selected {
            self.open_bucket(&bucket_name);
        }

        // Keep polling while results are pending; idle frames stay cheap.
        if self.session.is_fetching() {
            ctx.request_repaint_after(Duration::from_millis(100));
        }
    }
}

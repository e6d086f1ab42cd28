use chrono::Utc;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use shopfront::model::{Address, CartItem, OrderStatus, Product};
use shopfront::{status, ContextData, MemoryStore, OrderCalculator, Pipeline, PipelineControl, PipelineError, QuoteRequest, ShippingPolicy};
use std::sync::Arc;
use tokio::runtime::Runtime;
use uuid::Uuid;

#[derive(Clone, Debug, Default)]
struct BenchContext {
  counter: u64,
}

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
struct BenchError(#[from] PipelineError);

fn seeded_store(user_id: Uuid, lines: usize) -> MemoryStore {
  let store = MemoryStore::new();
  store.insert_address(Address {
    id: Uuid::new_v4(),
    user_id,
    full_name: "Bench Buyer".to_string(),
    phone: "0000000000".to_string(),
    line1: "1 Bench Street".to_string(),
    line2: None,
    city: "Pune".to_string(),
    state: "MH".to_string(),
    postal_code: "411001".to_string(),
    country: "IN".to_string(),
    is_default: true,
  });

  for i in 0..lines {
    let product = Product {
      id: Uuid::new_v4(),
      name: format!("product-{i}"),
      price_cents: 1_000 + i as i64,
      discount_percent: (i % 30) as u8,
      offer_window: None,
      stock: 1_000,
      is_blacklisted: false,
      weight_grams: Some(250),
      dimensions: None,
      variants: vec![],
    };
    store.add_to_cart(CartItem {
      id: Uuid::new_v4(),
      user_id,
      product_id: product.id,
      variant_id: None,
      color: None,
      size: None,
      quantity: 2,
      unit_price_cents: product.price_cents,
      added_at: Utc::now(),
    });
    store.insert_product(product);
  }
  store
}

fn bench_cart_quote(c: &mut Criterion) {
  let mut group = c.benchmark_group("CartQuote");
  let rt = Runtime::new().expect("tokio runtime");

  for lines in [1usize, 10, 50].iter() {
    let user_id = Uuid::new_v4();
    let store = Arc::new(seeded_store(user_id, *lines));
    let calculator = OrderCalculator::new(store.clone(), store.clone(), store, None, ShippingPolicy::default());
    let request = QuoteRequest::default();

    group.throughput(Throughput::Elements(*lines as u64));
    group.bench_with_input(BenchmarkId::from_parameter(lines), lines, |b, _| {
      b.to_async(&rt).iter(|| async {
        calculator.calculate(user_id, &request).await.expect("quote")
      });
    });
  }
  group.finish();
}

fn bench_status_validation(c: &mut Criterion) {
  c.bench_function("StatusValidateAllPairs", |b| {
    b.iter(|| {
      let mut valid = 0usize;
      for from in OrderStatus::ALL {
        for to in OrderStatus::ALL {
          if status::validate(criterion::black_box(from), criterion::black_box(to)).valid {
            valid += 1;
          }
        }
      }
      valid
    })
  });
}

fn bench_pipeline_overhead(c: &mut Criterion) {
  let mut group = c.benchmark_group("PipelineOverhead");
  let rt = Runtime::new().expect("tokio runtime");

  for num_steps in [1usize, 4, 16].iter() {
    let names: Vec<String> = (0..*num_steps).map(|i| format!("step_{i}")).collect();
    let step_defs: Vec<(&str, bool, Option<shopfront::pipeline::SkipCondition<BenchContext>>)> =
      names.iter().map(|n| (n.as_str(), false, None)).collect();
    let mut pipeline = Pipeline::<BenchContext, BenchError>::new(&step_defs);
    for name in &names {
      pipeline
        .on(name, |ctx: ContextData<BenchContext>| async move {
          ctx.write().counter += 1;
          Ok::<_, BenchError>(PipelineControl::Continue)
        })
        .expect("step exists");
    }
    let pipeline = Arc::new(pipeline);

    group.throughput(Throughput::Elements(*num_steps as u64));
    group.bench_with_input(BenchmarkId::from_parameter(num_steps), num_steps, |b, _| {
      b.to_async(&rt).iter_batched(
        || ContextData::new(BenchContext::default()),
        |ctx| {
          let pipeline = pipeline.clone();
          async move { pipeline.run(ctx).await.expect("pipeline run") }
        },
        criterion::BatchSize::SmallInput,
      );
    });
  }
  group.finish();
}

criterion_group!(benches, bench_cart_quote, bench_status_validation, bench_pipeline_overhead);
criterion_main!(benches);

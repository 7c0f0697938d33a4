//! Writes a synthetic `houses_to_rent_v2.csv` / `.parquet` pair with the
//! same columns as the real listings table.

use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }

    fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    fn range(&mut self, lo: i64, hi: i64) -> i64 {
        lo + (self.next_u64() % (hi - lo + 1) as u64) as i64
    }
}

#[derive(Debug, serde::Serialize)]
struct Listing {
    city: String,
    area: i64,
    rooms: i64,
    bathroom: i64,
    #[serde(rename = "parking spaces")]
    parking_spaces: i64,
    floor: String,
    animal: &'static str,
    furniture: &'static str,
    #[serde(rename = "hoa (R$)")]
    hoa: i64,
    #[serde(rename = "rent amount (R$)")]
    rent: i64,
    #[serde(rename = "property tax (R$)")]
    property_tax: i64,
    #[serde(rename = "fire insurance (R$)")]
    fire_insurance: i64,
    #[serde(rename = "total (R$)")]
    total: i64,
}

/// (city, listings, mean area, rent per m²)
const CITIES: [(&str, usize, f64, f64); 5] = [
    ("São Paulo", 1200, 95.0, 45.0),
    ("Rio de Janeiro", 300, 80.0, 42.0),
    ("Belo Horizonte", 220, 110.0, 30.0),
    ("Porto Alegre", 230, 75.0, 28.0),
    ("Campinas", 180, 100.0, 25.0),
];

fn generate(rng: &mut SimpleRng) -> Vec<Listing> {
    let mut listings = Vec::new();
    for &(city, n, mean_area, per_m2) in &CITIES {
        for _ in 0..n {
            let area = rng.gauss(mean_area, mean_area * 0.4).max(15.0).round() as i64;
            let furnished = rng.chance(0.25);
            let rent = (area as f64 * per_m2 * rng.gauss(1.0, 0.2).max(0.3)
                * if furnished { 1.3 } else { 1.0 })
            .round() as i64;
            let hoa = if rng.chance(0.2) {
                0
            } else {
                (area as f64 * rng.gauss(9.0, 3.0).max(1.0)).round() as i64
            };
            let property_tax = (rent as f64 * rng.gauss(0.08, 0.03).max(0.0)).round() as i64;
            let fire_insurance = (rent as f64 * 0.013).round().max(3.0) as i64;
            let floor = if rng.chance(0.2) {
                "-".to_string()
            } else {
                rng.range(1, 25).to_string()
            };

            listings.push(Listing {
                city: city.to_string(),
                area,
                rooms: (area / 35).clamp(1, 6),
                bathroom: (area / 50).clamp(1, 5),
                parking_spaces: rng.range(0, 3),
                floor,
                animal: if rng.chance(0.75) { "acept" } else { "not acept" },
                furniture: if furnished { "furnished" } else { "not furnished" },
                hoa,
                rent,
                property_tax,
                fire_insurance,
                total: hoa + rent + property_tax + fire_insurance,
            });
        }
    }

    // A few typos and luxury listings for the outlier filter to remove.
    let extremes = [
        ("São Paulo", 46_335, 8_000),
        ("Belo Horizonte", 24_606, 8_500),
        ("Campinas", 12_732, 2_100),
        ("São Paulo", 80, 1_117_000),
        ("Rio de Janeiro", 200, 150_000),
    ];
    for (city, area, rent) in extremes {
        listings.push(Listing {
            city: city.to_string(),
            area,
            rooms: 3,
            bathroom: 2,
            parking_spaces: 1,
            floor: "1".to_string(),
            animal: "acept",
            furniture: "not furnished",
            hoa: 0,
            rent,
            property_tax: 0,
            fire_insurance: 50,
            total: rent + 50,
        });
    }
    listings
}

fn write_csv(listings: &[Listing], path: &str) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).with_context(|| format!("creating {path}"))?;
    for l in listings {
        writer.serialize(l).context("writing CSV row")?;
    }
    writer.flush().context("flushing CSV")?;
    Ok(())
}

fn write_parquet(listings: &[Listing], path: &str) -> Result<()> {
    let int_col = |f: fn(&Listing) -> i64| -> ArrayRef {
        Arc::new(Int64Array::from(listings.iter().map(f).collect::<Vec<_>>()))
    };
    let str_col = |values: Vec<&str>| -> ArrayRef { Arc::new(StringArray::from(values)) };

    let schema = Arc::new(Schema::new(vec![
        Field::new("city", DataType::Utf8, false),
        Field::new("area", DataType::Int64, false),
        Field::new("rooms", DataType::Int64, false),
        Field::new("bathroom", DataType::Int64, false),
        Field::new("parking spaces", DataType::Int64, false),
        Field::new("floor", DataType::Utf8, false),
        Field::new("animal", DataType::Utf8, false),
        Field::new("furniture", DataType::Utf8, false),
        Field::new("hoa (R$)", DataType::Int64, false),
        Field::new("rent amount (R$)", DataType::Int64, false),
        Field::new("property tax (R$)", DataType::Int64, false),
        Field::new("fire insurance (R$)", DataType::Int64, false),
        Field::new("total (R$)", DataType::Int64, false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            str_col(listings.iter().map(|l| l.city.as_str()).collect()),
            int_col(|l| l.area),
            int_col(|l| l.rooms),
            int_col(|l| l.bathroom),
            int_col(|l| l.parking_spaces),
            str_col(listings.iter().map(|l| l.floor.as_str()).collect()),
            str_col(listings.iter().map(|l| l.animal).collect()),
            str_col(listings.iter().map(|l| l.furniture).collect()),
            int_col(|l| l.hoa),
            int_col(|l| l.rent),
            int_col(|l| l.property_tax),
            int_col(|l| l.fire_insurance),
            int_col(|l| l.total),
        ],
    )
    .context("building record batch")?;

    arrow::util::pretty::print_batches(&[batch.slice(0, batch.num_rows().min(5))])
        .context("printing preview")?;

    let file = std::fs::File::create(path).with_context(|| format!("creating {path}"))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);
    let listings = generate(&mut rng);

    write_csv(&listings, "houses_to_rent_v2.csv")?;
    write_parquet(&listings, "houses_to_rent_v2.parquet")?;

    println!(
        "Wrote {} listings to houses_to_rent_v2.csv and houses_to_rent_v2.parquet",
        listings.len()
    );
    Ok(())
}

// Unit tests for Donor Locator

use chrono::Utc;
use donor_locator::core::{
    distance::{calculate_bounding_box, haversine_distance, is_within_bounding_box, planar_distance},
    DistanceMode, Located, NearbyQuery, Predicate, ProximityError, ProximityFilter,
};
use donor_locator::models::{BloodRequest, BloodType, Coordinates, Donor, Hospital, RequestStatus, UrgencyLevel};
use geo::{point, HaversineDistance};

const LAKESIDE: Coordinates = Coordinates::new(28.2132, 83.9634);

#[derive(Debug, Clone, PartialEq)]
struct Pin {
    id: u32,
    at: Option<Coordinates>,
}

impl Located for Pin {
    fn coordinates(&self) -> Option<Coordinates> {
        self.at
    }
}

fn pin(id: u32, lat: f64, lon: f64) -> Pin {
    Pin {
        id,
        at: Some(Coordinates::new(lat, lon)),
    }
}

/// Point `km` due north of `origin` along the meridian
fn north_of(origin: Coordinates, km: f64) -> Coordinates {
    let degrees = (km / 6371.0).to_degrees();
    Coordinates::new(origin.latitude + degrees, origin.longitude)
}

fn donor(id: i64, name: &str, blood_type: BloodType, city: &str, lat: f64, lon: f64, available: bool) -> Donor {
    Donor {
        id,
        name: name.to_string(),
        blood_type,
        phone: Some("9846123456".to_string()),
        email: None,
        city: city.to_string(),
        address: Some("Lakeside-6".to_string()),
        latitude: Some(lat),
        longitude: Some(lon),
        is_available: available,
        last_donation_date: None,
        total_donations: 0,
        user_id: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn hospital(id: i64, name: &str, lat: f64, lon: f64, has_blood_bank: bool) -> Hospital {
    Hospital {
        id,
        name: name.to_string(),
        phone: "061-526416".to_string(),
        email: None,
        city: "Pokhara".to_string(),
        address: "Pokhara".to_string(),
        latitude: lat,
        longitude: lon,
        description: None,
        has_blood_bank,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn request(id: i64, blood_type: BloodType, status: RequestStatus, lat: f64, lon: f64) -> BloodRequest {
    BloodRequest {
        id,
        user_id: "user-1".to_string(),
        blood_type,
        units_needed: 2,
        hospital_name: "Western Regional Hospital".to_string(),
        hospital_address: "Ramghat, Pokhara-10".to_string(),
        city: Some("Pokhara".to_string()),
        latitude: lat,
        longitude: lon,
        urgency_level: UrgencyLevel::High,
        patient_name: "Hari".to_string(),
        contact_phone: "061-520297".to_string(),
        additional_notes: None,
        status,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

#[test]
fn test_haversine_matches_geo_reference() {
    let pairs = [
        ((28.2132, 83.9634), (28.2209, 83.9892)),
        ((27.7172, 85.3240), (28.2096, 83.9856)),
        ((40.7128, -74.0060), (51.5074, -0.1278)),
        ((-33.8688, 151.2093), (-36.8485, 174.7633)),
    ];

    for ((lat1, lon1), (lat2, lon2)) in pairs {
        let ours = haversine_distance(lat1, lon1, lat2, lon2);
        let reference = point!(x: lon1, y: lat1).haversine_distance(&point!(x: lon2, y: lat2)) / 1000.0;
        // geo uses the 6371.0088 km mean radius
        assert!(
            (ours - reference).abs() / reference < 1e-5,
            "({}, {}) -> ({}, {}): {} vs {}",
            lat1, lon1, lat2, lon2, ours, reference
        );
    }
}

#[test]
fn test_pokhara_example() {
    let filter = ProximityFilter::default();
    let query = NearbyQuery::new(LAKESIDE, 10.0);
    let candidates = vec![
        pin(1, 28.2397, 83.9989), // Phulbari
        pin(2, 28.2209, 83.9892), // Birauta
        pin(3, 27.7172, 85.3240), // Kathmandu
    ];

    let hits = filter.find_nearby(&query, candidates).unwrap();
    let ids: Vec<u32> = hits.iter().map(|h| h.entity.id).collect();
    assert_eq!(ids, vec![2, 1]);

    // Birauta is roughly 2.7 km from Lakeside
    assert!(hits[0].distance_km > 2.0 && hits[0].distance_km < 3.5);
}

#[test]
fn test_five_km_radius_boundary() {
    let filter = ProximityFilter::default();
    let query = NearbyQuery::new(LAKESIDE, 5.0);

    let inside = Pin { id: 1, at: Some(north_of(LAKESIDE, 4.999)) };
    let outside = Pin { id: 2, at: Some(north_of(LAKESIDE, 5.01)) };

    let hits = filter.find_nearby(&query, vec![inside, outside]).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].entity.id, 1);
}

#[test]
fn test_exact_radius_is_included() {
    let filter = ProximityFilter::default();
    let target = north_of(LAKESIDE, 5.0);
    let exact = haversine_distance(LAKESIDE.latitude, LAKESIDE.longitude, target.latitude, target.longitude);

    let query = NearbyQuery::new(LAKESIDE, exact);
    let hits = filter.find_nearby(&query, vec![Pin { id: 1, at: Some(target) }]).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].distance_km, exact);
}

#[test]
fn test_latitude_95_rejected() {
    let filter = ProximityFilter::default();
    let query = NearbyQuery::new(Coordinates::new(95.0, 83.9634), 10.0);

    let err = filter.find_nearby(&query, vec![pin(1, 28.2, 83.9)]).unwrap_err();
    assert_eq!(err.field(), "latitude");
    assert!(matches!(err, ProximityError::InvalidArgument { .. }));
}

#[test]
fn test_empty_candidates() {
    let filter = ProximityFilter::default();
    let hits = filter
        .find_nearby(&NearbyQuery::new(LAKESIDE, 10.0), Vec::<Pin>::new())
        .unwrap();
    assert!(hits.is_empty());
}

#[test]
fn test_result_properties_on_grid() {
    let filter = ProximityFilter::default();
    let query = NearbyQuery::new(LAKESIDE, 7.5);

    // 21x21 grid spaced ~1.1 km around the origin
    let candidates: Vec<Pin> = (0..441)
        .map(|i| {
            let row = (i / 21) as f64 - 10.0;
            let col = (i % 21) as f64 - 10.0;
            pin(i, LAKESIDE.latitude + row * 0.01, LAKESIDE.longitude + col * 0.01)
        })
        .collect();

    let first = filter.find_nearby(&query, candidates.clone()).unwrap();
    let second = filter.find_nearby(&query, candidates.clone()).unwrap();

    assert!(!first.is_empty());
    assert!(first.len() < candidates.len());
    assert!(first.iter().all(|h| h.distance_km <= query.radius_km));
    assert!(first.windows(2).all(|w| w[0].distance_km <= w[1].distance_km));
    assert_eq!(first, second);

    // nothing in range was dropped
    let expected = candidates
        .iter()
        .filter(|p| {
            let at = p.at.unwrap();
            haversine_distance(LAKESIDE.latitude, LAKESIDE.longitude, at.latitude, at.longitude) <= 7.5
        })
        .count();
    assert_eq!(first.len(), expected);
    assert_eq!(filter.count_nearby(&query, &candidates).unwrap(), expected);
}

#[test]
fn test_bounding_box_contains_every_hit() {
    for origin in [LAKESIDE, Coordinates::new(64.1466, -21.9426), Coordinates::new(-54.8019, -68.3030)] {
        for radius in [1.0, 10.0, 50.0, 100.0] {
            let bbox = calculate_bounding_box(origin.latitude, origin.longitude, radius);

            // ring of points just inside the radius
            for step in 0..36 {
                let bearing = (step as f64 * 10.0).to_radians();
                let d = radius * 0.999 / 6371.0;
                let lat1 = origin.latitude.to_radians();
                let lon1 = origin.longitude.to_radians();
                let lat2 = (lat1.sin() * d.cos() + lat1.cos() * d.sin() * bearing.cos()).asin();
                let lon2 = lon1
                    + (bearing.sin() * d.sin() * lat1.cos()).atan2(d.cos() - lat1.sin() * lat2.sin());

                let (lat2, lon2) = (lat2.to_degrees(), lon2.to_degrees());
                assert!(
                    is_within_bounding_box(lat2, lon2, &bbox),
                    "({}, {}) outside box for origin {:?} radius {}",
                    lat2, lon2, origin, radius
                );
            }
        }
    }
}

#[test]
fn test_bounding_box_near_antimeridian_covers_globe() {
    let bbox = calculate_bounding_box(-17.7134, 179.95, 20.0);
    assert_eq!(bbox.min_lon, -180.0);
    assert_eq!(bbox.max_lon, 180.0);
    assert!(is_within_bounding_box(-17.72, -179.98, &bbox));
}

#[test]
fn test_planar_and_haversine_disagree_at_boundary() {
    // Longitude degrees are shorter than 111 km away from the equator,
    // so planar overestimates east-west distances
    let east = Coordinates::new(LAKESIDE.latitude, LAKESIDE.longitude + 0.09);
    let planar = planar_distance(LAKESIDE.latitude, LAKESIDE.longitude, east.latitude, east.longitude);
    let great_circle = haversine_distance(LAKESIDE.latitude, LAKESIDE.longitude, east.latitude, east.longitude);
    assert!(planar > great_circle + 1.0);

    let radius = (planar + great_circle) / 2.0;
    let query = NearbyQuery::new(LAKESIDE, radius);
    let candidates = vec![Pin { id: 1, at: Some(east) }];

    let haversine = ProximityFilter::new(DistanceMode::Haversine, 100.0);
    let flat = ProximityFilter::new(DistanceMode::Planar, 100.0);
    assert_eq!(haversine.find_nearby(&query, candidates.clone()).unwrap().len(), 1);
    assert!(flat.find_nearby(&query, candidates).unwrap().is_empty());
}

#[test]
fn test_donor_search_with_filters() {
    let filter = ProximityFilter::default();
    let donors = vec![
        donor(1, "Ram Sharma", BloodType::APositive, "Pokhara", 28.2132, 83.9634, true),
        donor(2, "Sita Poudel", BloodType::BPositive, "Pokhara", 28.2209, 83.9892, true),
        donor(3, "Gopal Adhikari", BloodType::APositive, "Pokhara", 28.2300, 83.9800, false),
        donor(4, "Maya Gurung", BloodType::APositive, "Lekhnath", 28.1800, 84.0500, true),
    ];

    let query = NearbyQuery::new(LAKESIDE, 20.0)
        .with_predicate(Predicate::Available(true))
        .with_predicate(Predicate::BloodType(BloodType::APositive));

    let ids: Vec<i64> = filter
        .find_nearby(&query, &donors)
        .unwrap()
        .iter()
        .map(|h| h.entity.id)
        .collect();
    assert_eq!(ids, vec![1, 4]);

    let query = query.with_predicate(Predicate::city_contains("POKH"));
    let hits = filter.find_nearby(&query, &donors).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].entity.name, "Ram Sharma");
}

#[test]
fn test_donor_without_coordinates_skipped() {
    let mut missing = donor(1, "No Location", BloodType::ONegative, "Pokhara", 0.0, 0.0, true);
    missing.latitude = None;

    let hits = ProximityFilter::default()
        .find_nearby(&NearbyQuery::new(LAKESIDE, 100.0), vec![missing])
        .unwrap();
    assert!(hits.is_empty());
}

#[test]
fn test_blood_bank_and_open_request_predicates() {
    let filter = ProximityFilter::default();

    let hospitals = vec![
        hospital(1, "Manipal Teaching Hospital", 28.2397, 83.9989, true),
        hospital(2, "Metro City Hospital", 28.2209, 83.9892, false),
    ];
    let banks = filter
        .find_nearby(
            &NearbyQuery::new(LAKESIDE, 10.0).with_predicate(Predicate::HasBloodBank(true)),
            &hospitals,
        )
        .unwrap();
    assert_eq!(banks.len(), 1);
    assert_eq!(banks[0].entity.id, 1);

    let requests = vec![
        request(1, BloodType::ONegative, RequestStatus::Completed, 28.2195, 83.9856),
        request(2, BloodType::ONegative, RequestStatus::InProgress, 28.2195, 83.9856),
        request(3, BloodType::OPositive, RequestStatus::Pending, 28.2341, 83.9845),
    ];
    let open = filter
        .find_nearby(
            &NearbyQuery::new(LAKESIDE, 10.0).with_predicate(Predicate::OpenRequest),
            &requests,
        )
        .unwrap();
    let ids: Vec<i64> = open.iter().map(|h| h.entity.id).collect();
    assert_eq!(ids, vec![2, 3]);
}

#[test]
fn test_nearby_serialization_flattens_entity() {
    let hits = ProximityFilter::default()
        .find_nearby(
            &NearbyQuery::new(LAKESIDE, 10.0),
            vec![hospital(7, "Western Regional Hospital", 28.2195, 83.9856, true)],
        )
        .unwrap();

    let json = serde_json::to_value(&hits[0]).unwrap();
    assert_eq!(json["id"], 7);
    assert_eq!(json["name"], "Western Regional Hospital");
    let distance = json["distance"].as_f64().unwrap();
    assert_eq!(distance, (distance * 10.0).round() / 10.0);
}

#[test]
fn test_redacted_donor_hides_contact_details() {
    let d = donor(1, "Ram Sharma", BloodType::APositive, "Pokhara", 28.2132, 83.9634, true).redacted();
    let json = serde_json::to_value(&d).unwrap();
    assert!(json.get("phone").is_none());
    assert!(json.get("address").is_none());
    assert!(json.get("user_id").is_none());
    assert_eq!(json["blood_type"], "A+");
}
